use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for the Agora backend.
#[openapi(
    paths(
        crate::routes::auth::signup,
        crate::routes::auth::signin,
        crate::routes::auth::signout,
        crate::routes::auth::me,
        crate::routes::discussions::create_discussion,
        crate::routes::discussions::list_discussions,
        crate::routes::discussions::get_discussion,
        crate::routes::discussions::join_discussion,
        crate::routes::discussions::observe_discussion,
        crate::routes::discussions::start_discussion,
        crate::routes::discussions::advance_discussion,
        crate::routes::discussions::end_discussion,
        crate::routes::messages::post_message,
        crate::routes::messages::list_messages,
        crate::routes::messages::like_message,
        crate::routes::votes::cast_vote,
        crate::routes::votes::vote_results,
        crate::routes::sse::lobby_stream,
        crate::routes::sse::discussion_stream,
        crate::routes::health::healthz,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::sse::Handshake,
            crate::state::discussion::DiscussionKind,
            crate::state::discussion::DiscussionStatus,
            crate::state::discussion::ParticipantRole,
            crate::state::discussion::MessageKind,
            crate::state::discussion::VoteChoice,
            crate::state::state_machine::DebatePhase,
        )
    ),
    tags(
        (name = "auth", description = "Identity and session endpoints"),
        (name = "discussions", description = "Discussion lifecycle and phase control"),
        (name = "messages", description = "Debate messages and likes"),
        (name = "votes", description = "Final ballot cast by observers"),
        (name = "sse", description = "Server-sent events streams"),
        (name = "health", description = "Health check endpoints"),
    )
)]
pub struct ApiDoc;
