use std::convert::Infallible;
use std::sync::Arc;

use serde::Serialize;
use tracing::info;
use warp::http::StatusCode;
use warp::reply::Response;
use warp::{Filter, Rejection, Reply};

use crate::analysis::Analyzer;
use crate::error::LedgerError;
use crate::model::RecordId;
use crate::protocol::{ErrorBody, SubmitDream, SubmitThought, Submitted, MAX_FRAME};
use crate::Ledger;

/// Header naming the principal on delete requests.
pub const CALLER_HEADER: &str = "x-caller";

pub async fn start_api(ledger: Arc<Ledger>, analyzer: Arc<dyn Analyzer>, port: u16) {
    info!(port, "HTTP API listening");
    warp::serve(routes(ledger, analyzer)).run(([0, 0, 0, 0], port)).await;
}

pub fn routes(
    ledger: Arc<Ledger>,
    analyzer: Arc<dyn Analyzer>,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    // 1. POST /thoughts
    let submit_thought = warp::path!("thoughts")
    .and(warp::post())
    .and(json_body())
    .and(with_ledger(ledger.clone()))
    .map(|req: SubmitThought, ledger: Arc<Ledger>| {
        reply_result(
            ledger
            .submit_thought(&req.author, &req.content, &req.category)
            .map(|id| Submitted { id }),
        )
    });

    // 2. GET /thoughts/{id}
    let get_thought = warp::path!("thoughts" / RecordId)
    .and(warp::get())
    .and(with_ledger(ledger.clone()))
    .map(|id: RecordId, ledger: Arc<Ledger>| match ledger.get_thought(id) {
        Some(record) => warp::reply::json(&record).into_response(),
        None => error_reply(&LedgerError::NotFound(id)),
    });

    // 3. DELETE /thoughts/{id}  (owner only)
    let delete_thought = warp::path!("thoughts" / RecordId)
    .and(warp::delete())
    .and(warp::header::<String>(CALLER_HEADER))
    .and(with_ledger(ledger.clone()))
    .map(|id: RecordId, caller: String, ledger: Arc<Ledger>| {
        reply_result(ledger.delete_thought(&caller, id))
    });

    // 4. POST /dreams
    let submit_dream = warp::path!("dreams")
    .and(warp::post())
    .and(json_body())
    .and(with_ledger(ledger.clone()))
    .map(|req: SubmitDream, ledger: Arc<Ledger>| {
        reply_result(
            ledger
            .submit_dream(&req.dreamer, &req.content, req.themes)
            .map(|id| Submitted { id }),
        )
    });

    // 5. GET /dreams/{id}
    let get_dream = warp::path!("dreams" / RecordId)
    .and(warp::get())
    .and(with_ledger(ledger.clone()))
    .map(|id: RecordId, ledger: Arc<Ledger>| match ledger.get_dream(id) {
        Some(record) => warp::reply::json(&record).into_response(),
        None => not_found(format!("Dream not found: {}", id)),
    });

    // --- INDEX LOOKUPS ---

    let user_thoughts = warp::path!("users" / String / "thoughts")
    .and(warp::get())
    .and(with_ledger(ledger.clone()))
    .map(|user: String, ledger: Arc<Ledger>| warp::reply::json(&ledger.list_by_author(&user)));

    let user_dreams = warp::path!("users" / String / "dreams")
    .and(warp::get())
    .and(with_ledger(ledger.clone()))
    .map(|user: String, ledger: Arc<Ledger>| warp::reply::json(&ledger.list_dreams_by_author(&user)));

    let category_thoughts = warp::path!("categories" / String / "thoughts")
    .and(warp::get())
    .and(with_ledger(ledger.clone()))
    .map(|category: String, ledger: Arc<Ledger>| warp::reply::json(&ledger.list_by_category(&category)));

    // --- ANALYSIS ---

    let analyze_thoughts = warp::path!("analysis" / "thoughts")
    .and(warp::get())
    .and(with_ledger(ledger.clone()))
    .and(with_analyzer(analyzer.clone()))
    .map(|ledger: Arc<Ledger>, analyzer: Arc<dyn Analyzer>| {
        warp::reply::json(&ledger.analyze_thoughts(analyzer.as_ref()))
    });

    let analyze_dreams = warp::path!("analysis" / "dreams")
    .and(warp::get())
    .and(with_ledger(ledger))
    .and(with_analyzer(analyzer))
    .map(|ledger: Arc<Ledger>, analyzer: Arc<dyn Analyzer>| {
        warp::reply::json(&ledger.analyze_dreams(analyzer.as_ref()))
    });

    submit_thought
    .or(get_thought)
    .or(delete_thought)
    .or(submit_dream)
    .or(get_dream)
    .or(user_thoughts)
    .or(user_dreams)
    .or(category_thoughts)
    .or(analyze_thoughts)
    .or(analyze_dreams)
    .recover(handle_rejection)
    .with(warp::trace::request())
}

fn with_ledger(ledger: Arc<Ledger>) -> impl Filter<Extract = (Arc<Ledger>,), Error = Infallible> + Clone {
    warp::any().map(move || ledger.clone())
}

fn with_analyzer(analyzer: Arc<dyn Analyzer>) -> impl Filter<Extract = (Arc<dyn Analyzer>,), Error = Infallible> + Clone {
    warp::any().map(move || analyzer.clone())
}

fn json_body<T: serde::de::DeserializeOwned + Send>() -> impl Filter<Extract = (T,), Error = Rejection> + Clone {
    warp::body::content_length_limit(MAX_FRAME as u64).and(warp::body::json())
}

fn status_for(e: &LedgerError) -> StatusCode {
    match e {
        LedgerError::InvalidContent | LedgerError::InvalidCategory => StatusCode::BAD_REQUEST,
        LedgerError::Unauthorized => StatusCode::FORBIDDEN,
        LedgerError::NotFound(_) => StatusCode::NOT_FOUND,
        LedgerError::Poisoned
        | LedgerError::IdsExhausted
        | LedgerError::Snapshot(_)
        | LedgerError::CorruptSnapshot => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn reply_result<T: Serialize>(result: Result<T, LedgerError>) -> Response {
    match result {
        Ok(value) => warp::reply::json(&value).into_response(),
        Err(e) => error_reply(&e),
    }
}

fn error_reply(e: &LedgerError) -> Response {
    warp::reply::with_status(warp::reply::json(&ErrorBody::from(e)), status_for(e)).into_response()
}

fn not_found(message: String) -> Response {
    let body = ErrorBody { code: "not_found".into(), message };
    warp::reply::with_status(warp::reply::json(&body), StatusCode::NOT_FOUND).into_response()
}

async fn handle_rejection(err: Rejection) -> Result<Response, Infallible> {
    if err.is_not_found() {
        return Ok(not_found("No such route".into()));
    }

    let (status, body) = if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
        (StatusCode::BAD_REQUEST, ErrorBody::bad_request(e.to_string()))
    } else if let Some(e) = err.find::<warp::reject::MissingHeader>() {
        (StatusCode::BAD_REQUEST, ErrorBody::bad_request(e.to_string()))
    } else if err.find::<warp::reject::UnsupportedMediaType>().is_some() {
        (StatusCode::UNSUPPORTED_MEDIA_TYPE, ErrorBody::bad_request("Expected application/json"))
    } else if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        (StatusCode::PAYLOAD_TOO_LARGE, ErrorBody::bad_request("Payload too large"))
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, ErrorBody::bad_request("Method not allowed"))
    } else {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorBody { code: "internal".into(), message: format!("{:?}", err) },
        )
    };
    Ok(warp::reply::with_status(warp::reply::json(&body), status).into_response())
}
