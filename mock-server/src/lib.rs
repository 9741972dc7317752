use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Query, Request, State},
    http::{header, HeaderName, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use hyper::body::Incoming;
use hyper_util::rt::TokioIo;
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};
use tower::Service;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreEntry {
    pub log_time: String,
    pub uuid: String,
    pub user_name: String,
    pub score: i64,
}

#[derive(Debug, Deserialize)]
pub struct SubmitScore {
    pub uuid: Option<String>,
    pub user_name: Option<String>,
    pub score: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RankingQuery {
    pub uuid: Option<String>,
    pub limit: Option<i64>,
}

/// 1-based position → entry. Serializes as `{"1": {...}, "2": {...}}`.
pub type RankingTable = BTreeMap<usize, ScoreEntry>;

#[derive(Debug, Default)]
pub struct Ranking {
    entries: Vec<ScoreEntry>,
}

impl Ranking {
    /// Insert a new player, or raise an existing player's score. A lower
    /// score never replaces a higher one; the stored name is kept.
    pub fn submit(&mut self, uuid: &str, user_name: &str, score: i64, log_time: String) {
        match self.entries.iter_mut().find(|e| e.uuid == uuid) {
            Some(entry) => {
                if entry.score <= score {
                    entry.score = score;
                    entry.log_time = log_time;
                }
            }
            None => self.entries.push(ScoreEntry {
                log_time,
                uuid: uuid.to_string(),
                user_name: user_name.to_string(),
                score,
            }),
        }
    }

    /// Highest scores first; `None` means everyone. Ties keep submission order.
    pub fn top(&self, limit: Option<usize>) -> RankingTable {
        let mut sorted: Vec<&ScoreEntry> = self.entries.iter().collect();
        sorted.sort_by(|a, b| b.score.cmp(&a.score));
        sorted
            .into_iter()
            .take(limit.unwrap_or(usize::MAX))
            .enumerate()
            .map(|(i, entry)| (i + 1, entry.clone()))
            .collect()
    }

    /// The player's competition rank (ties share a rank), or an empty table.
    pub fn position_of(&self, uuid: &str) -> RankingTable {
        let Some(entry) = self.entries.iter().find(|e| e.uuid == uuid) else {
            return RankingTable::new();
        };
        let rank = 1 + self.entries.iter().filter(|e| e.score > entry.score).count();
        RankingTable::from([(rank, entry.clone())])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub type Db = Arc<RwLock<Ranking>>;

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Ranking::default()));
    Router::new()
        .route("/", get(get_ranking).post(submit_score))
        .with_state(db)
}

/// Serve `app()` on `listener`.
///
/// Connections allow HTTP/1 half-close: clients that send a request and close
/// immediately (fire-and-forget POST) still get their request processed.
pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    let app = app();
    loop {
        let (stream, peer) = listener.accept().await?;
        let service = app.clone();
        tokio::spawn(async move {
            let hyper_service =
                hyper::service::service_fn(move |request: Request<Incoming>| service.clone().call(request));
            let served = hyper::server::conn::http1::Builder::new()
                .half_close(true)
                .serve_connection(TokioIo::new(stream), hyper_service)
                .await;
            if let Err(e) = served {
                tracing::debug!("connection from {peer} ended: {e}");
            }
        });
    }
}

fn cors_headers() -> [(HeaderName, &'static str); 3] {
    [
        (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
        (header::ACCESS_CONTROL_ALLOW_HEADERS, "Content-Type"),
        (header::ACCESS_CONTROL_ALLOW_METHODS, "GET, POST"),
    ]
}

fn log_time() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

async fn get_ranking(State(db): State<Db>, Query(query): Query<RankingQuery>) -> Response {
    let ranking = db.read().await;
    let uuid = query.uuid.as_deref().filter(|u| !u.is_empty());
    let table = match (query.limit, uuid) {
        // Negative limits mean "no limit".
        (Some(limit), _) => ranking.top(usize::try_from(limit).ok()),
        (None, Some(uuid)) => ranking.position_of(uuid),
        (None, None) => ranking.top(None),
    };

    match serde_json::to_string(&table) {
        Ok(body) => (
            cors_headers(),
            [(header::CONTENT_TYPE, "application/json; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("failed to encode ranking: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, cors_headers()).into_response()
        }
    }
}

async fn submit_score(State(db): State<Db>, payload: Result<Json<SubmitScore>, JsonRejection>) -> Response {
    let submission = match payload {
        Ok(Json(submission)) => submission,
        Err(rejection) => {
            tracing::debug!("rejected score submission: {rejection}");
            return (StatusCode::BAD_REQUEST, cors_headers()).into_response();
        }
    };

    // Empty strings and a zero score count as missing.
    let non_empty = |s: Option<String>| s.filter(|s| !s.is_empty());
    let (Some(uuid), Some(user_name), Some(score)) = (
        non_empty(submission.uuid),
        non_empty(submission.user_name),
        submission.score.filter(|score| *score != 0),
    ) else {
        return (StatusCode::BAD_REQUEST, cors_headers()).into_response();
    };

    db.write().await.submit(&uuid, &user_name, score, log_time());
    tracing::info!("recorded score {score} for {user_name} ({uuid})");
    (StatusCode::OK, cors_headers()).into_response()
}
