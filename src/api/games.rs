use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};

use crate::{
    error::Result,
    models::{ApiResponse, CreateGameRequest, Game, PaginatedResponse, Pagination, UpdateGameRequest},
    utils::resolve_page,
};

use super::AppState;

/// POST /games
pub async fn create_game(
    State(state): State<AppState>,
    payload: std::result::Result<Json<CreateGameRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<Game>>)> {
    let Json(req) = payload?;
    let new_game = req.into_new_game()?;
    let game = state.store.create_game(new_game).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(game))))
}

/// GET /games?skip=&limit=
pub async fn list_games(
    State(state): State<AppState>,
    query: std::result::Result<Query<Pagination>, QueryRejection>,
) -> Result<Json<ApiResponse<PaginatedResponse<Game>>>> {
    let Query(page) = query?;
    let (skip, limit) = resolve_page(page)?;
    let items = state.store.list_games(skip, limit).await?;
    Ok(Json(ApiResponse::success(PaginatedResponse { items, skip, limit })))
}

/// GET /games/{id}
pub async fn get_game(
    State(state): State<AppState>,
    path: std::result::Result<Path<i64>, PathRejection>,
) -> Result<Json<ApiResponse<Game>>> {
    let Path(id) = path?;
    let game = state.store.get_game(id).await?;
    Ok(Json(ApiResponse::success(game)))
}

/// PUT /games/{id}
pub async fn update_game(
    State(state): State<AppState>,
    path: std::result::Result<Path<i64>, PathRejection>,
    payload: std::result::Result<Json<UpdateGameRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<Game>>> {
    let Path(id) = path?;
    let Json(update) = payload?;
    update.validate()?;

    let game = if update.is_empty() {
        state.store.get_game(id).await?
    } else {
        state.store.update_game(id, update).await?
    };
    Ok(Json(ApiResponse::success(game)))
}

/// DELETE /games/{id}
pub async fn delete_game(
    State(state): State<AppState>,
    path: std::result::Result<Path<i64>, PathRejection>,
) -> Result<Json<ApiResponse<String>>> {
    let Path(id) = path?;
    state.store.delete_game(id).await?;
    Ok(Json(ApiResponse::success("Game deleted".to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        api::test_support::state_with, db::memory::MemoryStore, error::AppError,
        integrations::fake::FakeProvider,
    };
    use std::sync::Arc;

    fn setup() -> (Arc<MemoryStore>, AppState) {
        let store = Arc::new(MemoryStore::new());
        let state = state_with(store.clone(), FakeProvider::default());
        (store, state)
    }

    fn create_body(value: serde_json::Value) -> std::result::Result<Json<CreateGameRequest>, JsonRejection> {
        Ok(Json(serde_json::from_value(value).unwrap()))
    }

    fn update_body(value: serde_json::Value) -> std::result::Result<Json<UpdateGameRequest>, JsonRejection> {
        Ok(Json(serde_json::from_value(value).unwrap()))
    }

    async fn create(state: &AppState, value: serde_json::Value) -> Result<Game> {
        let (status, Json(resp)) = create_game(State(state.clone()), create_body(value)).await?;
        assert_eq!(status, StatusCode::CREATED);
        Ok(resp.data)
    }

    #[tokio::test]
    async fn create_then_get_round_trips_board() {
        let (_, state) = setup();
        let created = create(
            &state,
            serde_json::json!({
                "robots": "[{\"x\":0,\"y\":0}]",
                "walls": "[]",
                "target": "{\"x\":5,\"y\":5}",
                "limit": 120
            }),
        )
        .await
        .unwrap();

        let Json(resp) = get_game(State(state.clone()), Ok(Path(created.id))).await.unwrap();
        let fetched = resp.data;
        assert_eq!(fetched, created);
        assert_eq!(fetched.robots, "[{\"x\":0,\"y\":0}]");
        assert_eq!(fetched.walls, "[]");
        assert_eq!(fetched.target, "{\"x\":5,\"y\":5}");
        assert_eq!(fetched.limit, 120);

        let body = serde_json::to_value(ApiResponse::success(fetched)).unwrap();
        assert_eq!(body["data"]["id"], created.id);
        assert_eq!(body["data"]["limit"], 120);
    }

    #[tokio::test]
    async fn malformed_json_field_creates_nothing() {
        let (store, state) = setup();
        for field in ["robots", "walls", "target"] {
            let mut body = serde_json::json!({
                "robots": "[]",
                "walls": "[]",
                "target": "{}",
            });
            body[field] = serde_json::Value::String("{not json".to_string());
            let err = create(&state, body).await.unwrap_err();
            assert!(matches!(err, AppError::InvalidPayload(_)));
        }
        assert_eq!(store.game_count(), 0);
    }

    #[tokio::test]
    async fn malformed_update_leaves_record_untouched() {
        let (_, state) = setup();
        let created = create(
            &state,
            serde_json::json!({"robots": "[]", "walls": "[]", "target": "{}", "limit": 60}),
        )
        .await
        .unwrap();

        let err = update_game(
            State(state.clone()),
            Ok(Path(created.id)),
            update_body(serde_json::json!({"walls": "[[", "limit": 5})),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::InvalidPayload(_)));

        let Json(resp) = get_game(State(state), Ok(Path(created.id))).await.unwrap();
        assert_eq!(resp.data, created);
    }

    #[tokio::test]
    async fn partial_update_changes_only_limit() {
        let (_, state) = setup();
        let created = create(
            &state,
            serde_json::json!({"robots": "[1]", "walls": "[2]", "target": "{\"t\":3}"}),
        )
        .await
        .unwrap();
        assert_eq!(created.limit, 180);

        let Json(resp) = update_game(
            State(state.clone()),
            Ok(Path(created.id)),
            update_body(serde_json::json!({"limit": 45})),
        )
        .await
        .unwrap();
        let updated = resp.data;
        assert_eq!(updated.limit, 45);
        assert_eq!(updated.robots, created.robots);
        assert_eq!(updated.walls, created.walls);
        assert_eq!(updated.target, created.target);
    }

    #[tokio::test]
    async fn update_missing_game_is_not_found() {
        let (_, state) = setup();
        let err = update_game(
            State(state),
            Ok(Path(404)),
            update_body(serde_json::json!({"limit": 1})),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn delete_removes_game_and_second_delete_fails() {
        let (_, state) = setup();
        let created = create(
            &state,
            serde_json::json!({"robots": "[]", "walls": "[]", "target": "{}"}),
        )
        .await
        .unwrap();

        let Json(resp) = delete_game(State(state.clone()), Ok(Path(created.id))).await.unwrap();
        assert!(resp.success);

        let err = get_game(State(state.clone()), Ok(Path(created.id))).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        let err = delete_game(State(state), Ok(Path(created.id))).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn list_paginates_in_insertion_order() {
        let (_, state) = setup();
        let mut ids = Vec::new();
        for limit in 0..5 {
            let game = create(
                &state,
                serde_json::json!({"robots": "[]", "walls": "[]", "target": "{}", "limit": limit}),
            )
            .await
            .unwrap();
            ids.push(game.id);
        }

        let page = Pagination {
            skip: Some(1),
            limit: Some(2),
        };
        let Json(resp) = list_games(State(state), Ok(Query(page))).await.unwrap();
        let listed: Vec<i64> = resp.data.items.iter().map(|g| g.id).collect();
        assert_eq!(listed, ids[1..3].to_vec());
        assert_eq!(resp.data.skip, 1);
        assert_eq!(resp.data.limit, 2);
    }
}
