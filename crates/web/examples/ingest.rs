//! Feeds a few requests through the standard chain, the way a transport would.
//!
//! Run with `cargo run --example ingest` and watch the `tracing` output.

use bytes::Bytes;
use futures::stream;
use micro_ingest_http::protocol::body::ReqBody;
use micro_ingest_http::protocol::{ParseError, PayloadItem, RequestHeader};
use micro_ingest_web::{Flow, Pipeline, PipelineConfig, Request, Responder};
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

const CONFIG: &str = r#"{
    "accept": { "acceptable": ["json", "text/csv"] },
    "date": { "clockSkew": 300 },
    "bodyParser": { "maxBodySize": 64, "rejectUnknown": true }
}"#;

async fn ingest(pipeline: &Pipeline, head: http::Request<()>, chunks: &[&'static str]) {
    let items = chunks
        .iter()
        .map(|chunk| Ok::<_, ParseError>(PayloadItem::Chunk(Bytes::from_static(chunk.as_bytes()))))
        .chain(std::iter::once(Ok(PayloadItem::Eof)));
    let mut payload = stream::iter(items);

    let (body, mut sender) = ReqBody::body_channel(&mut payload);
    let mut req = Request::new(RequestHeader::from(head), body);

    let execute = async {
        let flow = pipeline.execute(&mut req).await;
        // an unread body must not keep the sender waiting
        drop(req.take_body_stream());
        flow
    };
    let (sent, flow) = tokio::join!(sender.send_body(), execute);
    if let Err(e) = sent {
        error!(cause = %e, "transport failed");
    }
    sender.skip_body().await;

    match flow {
        Ok(Flow::Completed) => info!(body = ?req.body(), params = %req.params(), "request ingested"),
        Ok(Flow::Terminated(response)) => info!(status = %response.status(), "request answered early"),
        Err(e) => {
            let response = e.response_to(&req);
            info!(status = %response.status(), body = ?response.body().bytes(), "request rejected");
        }
    }
}

fn post(content_type: &str) -> http::request::Builder {
    http::Request::post("/orders").header("Content-Type", content_type).header("Transfer-Encoding", "chunked")
}

#[tokio::main]
async fn main() {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::DEBUG).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let config: PipelineConfig = serde_json::from_str(CONFIG).expect("config should be valid");
    let pipeline = Pipeline::from_config(&config);
    info!(stages = ?pipeline.stage_names(), "pipeline ready");

    let json = post("application/json").body(()).expect("request should be valid");
    ingest(&pipeline, json, &[r#"{"customer":"#, r#""zava","qty":3}"#]).await;

    let csv = post("text/csv").body(()).expect("request should be valid");
    ingest(&pipeline, csv, &["sku,qty\n", "A-1,2\nB-7,1\n"]).await;

    let too_large = post("text/plain").body(()).expect("request should be valid");
    ingest(&pipeline, too_large, &["0123456789abcdef"; 8]).await;

    let xml = post("application/xml").header("Accept", "application/xml").body(()).expect("request should be valid");
    ingest(&pipeline, xml, &["<order/>"]).await;
}
