use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Movie Night Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::sse::public_stream,
        crate::routes::sse::operator_stream,
        crate::routes::cycle::today,
        crate::routes::cycle::winning_schedule,
        crate::routes::cycle::record_decision,
        crate::routes::cycle::submit_nominations,
        crate::routes::cycle::submit_vote,
        crate::routes::cycle::update_schedule_settings,
        crate::routes::cycle::override_status,
        crate::routes::cycle::reset_cycle,
        crate::routes::library::list_library,
        crate::routes::library::add_movie,
        crate::routes::library::remove_movie,
        crate::routes::library::set_streak,
        crate::routes::library::list_shared,
        crate::routes::catalog::search,
        crate::routes::catalog::lookup,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::cycle::CycleSnapshot,
            crate::dto::cycle::DecisionRequest,
            crate::dto::cycle::NominationsRequest,
            crate::dto::cycle::VoteRequest,
            crate::dto::cycle::ScheduleSettingsRequest,
            crate::dto::cycle::StatusOverrideRequest,
            crate::dto::cycle::ScheduleResponse,
            crate::dto::cycle::WinnerSummary,
            crate::dto::cycle::VoteSummary,
            crate::dto::cycle::ScheduleSettingsSummary,
            crate::dto::movie::AddMovieRequest,
            crate::dto::movie::StreakUpdateRequest,
            crate::dto::movie::LibraryMovieSummary,
            crate::dto::movie::SharedMovieSummary,
            crate::dto::movie::CatalogMovieSummary,
            crate::dto::movie::EnrichmentStatus,
            crate::dto::sse::Handshake,
            crate::dto::sse::OperatorHandshake,
            crate::dto::sse::StatusChangedEvent,
            crate::dto::sse::SystemStatus,
            crate::state::state_machine::CycleStatus,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "cycle", description = "Daily cycle participation and operator controls"),
        (name = "library", description = "Per-user movie libraries and the shared pool"),
        (name = "catalog", description = "External movie catalog search and lookup"),
        (name = "sse", description = "Server-sent events streams"),
    )
)]
pub struct ApiDoc;
