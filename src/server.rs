use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::BufWriter;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};

use crate::analysis::Analyzer;
use crate::error::LedgerError;
use crate::protocol::*;
use crate::Ledger;

pub struct LedgerServer {
    ledger: Arc<Ledger>,
    analyzer: Arc<dyn Analyzer>,
}

impl LedgerServer {
    pub fn new(ledger: Arc<Ledger>, analyzer: Arc<dyn Analyzer>) -> Self {
        Self { ledger, analyzer }
    }

    pub async fn run(&self, addr: &str) -> std::io::Result<()> {
        let listener = TcpListener::bind(addr).await?;
        info!(addr = %addr, "ledger server listening");
        self.serve(listener).await
    }

    /// Accept loop over an already bound listener. One task per client.
    pub async fn serve(&self, listener: TcpListener) -> std::io::Result<()> {
        loop {
            match listener.accept().await {
                Ok((socket, peer)) => {
                    let ledger = self.ledger.clone();
                    let analyzer = self.analyzer.clone();
                    tokio::spawn(async move {
                        debug!(peer = %peer, "client connected");
                        if let Err(e) = handle_client(socket, ledger, analyzer).await {
                            // Ignore expected disconnections to keep logs clean
                            if e.kind() != std::io::ErrorKind::UnexpectedEof {
                                warn!(peer = %peer, error = %e, "client error");
                            }
                        }
                    });
                }
                Err(e) => error!(error = %e, "connection failed"),
            }
        }
    }
}

async fn handle_client(mut stream: TcpStream, ledger: Arc<Ledger>, analyzer: Arc<dyn Analyzer>) -> std::io::Result<()> {
    loop {
        let (op_code, payload) = match read_frame_async(&mut stream, MAX_FRAME).await? {
            Some(frame) => frame,
            None => return Ok(()),
        };

        let (status, body) = dispatch(&ledger, analyzer.as_ref(), op_code, &payload);

        let mut writer = BufWriter::new(&mut stream);
        write_frame_async(&mut writer, status, &body, MAX_RESPONSE).await?;
    }
}

/// Executes one request against the ledger and returns the response status
/// and body. Never fails: every problem becomes an error body.
pub fn dispatch(ledger: &Ledger, analyzer: &dyn Analyzer, op_code: u8, payload: &[u8]) -> (u8, Vec<u8>) {
    match op_code {
        // Writes
        OP_SUBMIT_THOUGHT => with_request(payload, |req: SubmitThought| {
            ledger
            .submit_thought(&req.author, &req.content, &req.category)
            .map(|id| Submitted { id })
        }),
        OP_SUBMIT_DREAM => with_request(payload, |req: SubmitDream| {
            ledger
            .submit_dream(&req.dreamer, &req.content, req.themes)
            .map(|id| Submitted { id })
        }),
        OP_DELETE_THOUGHT => with_request(payload, |req: DeleteThought| {
            ledger.delete_thought(&req.caller, req.id)
        }),

        // Reads
        OP_GET_THOUGHT => with_request(payload, |req: ById| Ok(ledger.get_thought(req.id))),
        OP_GET_DREAM => with_request(payload, |req: ById| Ok(ledger.get_dream(req.id))),
        OP_USER_THOUGHTS => with_request(payload, |req: ByKey| Ok(ledger.list_by_author(&req.key))),
        OP_USER_DREAMS => with_request(payload, |req: ByKey| Ok(ledger.list_dreams_by_author(&req.key))),
        OP_CATEGORY_THOUGHTS => with_request(payload, |req: ByKey| Ok(ledger.list_by_category(&req.key))),

        // Analysis
        OP_ANALYZE_THOUGHTS => ok(&ledger.analyze_thoughts(analyzer)),
        OP_ANALYZE_DREAMS => ok(&ledger.analyze_dreams(analyzer)),

        _ => {
            warn!(op_code, "unknown opcode");
            err(&ErrorBody::bad_request(format!("Unknown OpCode: 0x{:02X}", op_code)))
        }
    }
}

fn with_request<Req, Resp, F>(payload: &[u8], handler: F) -> (u8, Vec<u8>)
where
Req: DeserializeOwned,
Resp: Serialize,
F: FnOnce(Req) -> Result<Resp, LedgerError>,
{
    let req: Req = match serde_json::from_slice(payload) {
        Ok(req) => req,
        Err(e) => return err(&ErrorBody::bad_request(e.to_string())),
    };
    match handler(req) {
        Ok(resp) => ok(&resp),
        Err(e) => err(&ErrorBody::from(&e)),
    }
}

fn ok<T: Serialize>(value: &T) -> (u8, Vec<u8>) {
    ok_within(value, MAX_RESPONSE)
}

/// Encodes a success body, or an `internal` error body if it would not fit
/// in a response frame. The session stays usable either way.
fn ok_within<T: Serialize + ?Sized>(value: &T, max: usize) -> (u8, Vec<u8>) {
    match serde_json::to_vec(value) {
        Ok(body) if body.len() > max => {
            warn!(bytes = body.len(), max, "response too large");
            err(&ErrorBody {
                code: "internal".into(),
                message: format!("Response too large: {} bytes (Max {})", body.len(), max),
            })
        }
        Ok(body) => (STATUS_OK, body),
        Err(e) => err(&ErrorBody { code: "internal".into(), message: e.to_string() }),
    }
}

fn err(body: &ErrorBody) -> (u8, Vec<u8>) {
    // ErrorBody is two strings; serializing it cannot fail
    (STATUS_ERR, serde_json::to_vec(body).unwrap_or_default())
}
