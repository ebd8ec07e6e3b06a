use axum::{
    extract::{Request, State},
    http::HeaderValue,
    middleware::{from_fn_with_state, Next},
    routing::{delete, get, patch, post, MethodRouter},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::auth::Permission;
use crate::config::ServerConfig;
use crate::handlers::{elevated, protected, public};
use crate::middleware::authenticate;
use crate::state::AppState;

/// Build the full application router
pub fn app(state: AppState, server: &ServerConfig) -> Router {
    Router::new()
        .merge(system_routes())
        .merge(search_routes())
        .merge(game_routes(&state))
        .merge(user_routes(&state))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(server)),
        )
        .with_state(state)
}

const BASELINE: &[Permission] = &[Permission::ReadGames];
const EDIT: &[Permission] = &[Permission::ReadGames, Permission::EditGames];
const DELETE: &[Permission] = &[Permission::ReadGames, Permission::DeleteGames];

/// Requires a verified bearer token holding the baseline permission
fn protected(route: MethodRouter<AppState>, state: &AppState) -> MethodRouter<AppState> {
    guarded(route, BASELINE, state)
}

/// Requires a verified bearer token holding every permission in `required`
fn guarded(
    route: MethodRouter<AppState>,
    required: &'static [Permission],
    state: &AppState,
) -> MethodRouter<AppState> {
    route.route_layer(from_fn_with_state(
        state.clone(),
        move |state: State<AppState>, request: Request, next: Next| {
            authenticate(required, state, request, next)
        },
    ))
}

fn system_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(public::root))
        .route("/health", get(public::health))
}

fn search_routes() -> Router<AppState> {
    Router::new()
        .route("/api/search-games", get(public::search_games))
        .route(
            "/api/search-games-details/:external_id",
            get(public::search_game_details),
        )
}

fn game_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/api/games",
            get(public::games_list).merge(protected(post(protected::games_create), state)),
        )
        .route(
            "/api/games/:id",
            get(public::games_show)
                .merge(guarded(patch(elevated::games_update), EDIT, state))
                .merge(guarded(delete(elevated::games_destroy), DELETE, state)),
        )
        .route(
            "/api/games/:id/comments",
            protected(post(protected::comments_create), state),
        )
        .route("/api/top-games", get(public::games_top))
}

fn user_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/api/users/me", protected(get(protected::users_me), state))
        .route(
            "/api/users/game_status/:game_id",
            protected(get(protected::game_status), state),
        )
        // Lists of the caller
        .route("/api/users/library", protected(get(protected::library), state))
        .route(
            "/api/users/library/:game_id",
            protected(delete(protected::library_remove), state),
        )
        .route(
            "/api/users/now_playing",
            protected(get(protected::now_playing), state),
        )
        .route(
            "/api/users/now_playing/:game_id",
            protected(delete(protected::now_playing_remove), state),
        )
        // Subject-addressed membership changes
        .route(
            "/api/users/:sub/library/:game_id",
            protected(
                post(protected::library_add).delete(protected::library_remove_for_subject),
                state,
            ),
        )
        .route(
            "/api/users/:sub/now_playing/:game_id",
            protected(
                post(protected::now_playing_add).delete(protected::now_playing_remove_for_subject),
                state,
            ),
        )
}

fn cors_layer(server: &ServerConfig) -> CorsLayer {
    if server.cors_origins.is_empty() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = server
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
}
