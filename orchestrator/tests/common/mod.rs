#![allow(dead_code)]

use actix_multipart::Multipart;
use actix_web::dev::ServerHandle;
use actix_web::{App, HttpResponse, HttpServer, web};
use futures_util::{StreamExt, TryStreamExt};
use orchestrator::config::ReportConfig;
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use url::Url;

pub const JPEG_BYTES: &[u8] = &[0xff, 0xd8, 0xff, 0xe0, 0x00, 0x10, b'J', b'F', b'I', b'F', 0x00];

/// An upload as seen by the mock classification service.
#[derive(Debug, Clone)]
pub struct ReceivedUpload {
    pub field: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// What the mock services saw, shared between handlers and the test.
#[derive(Default)]
pub struct Recorder {
    pub uploads: Mutex<Vec<Vec<ReceivedUpload>>>,
    pub prompts: Mutex<Vec<String>>,
    pub api_keys: Mutex<Vec<Option<String>>>,
}

impl Recorder {
    pub fn upload_count(&self) -> usize {
        self.uploads.lock().unwrap().len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[derive(Clone)]
pub struct Reply {
    pub status: u16,
    pub body: String,
    pub delay_ms: u64,
}

impl Reply {
    pub fn json(status: u16, body: serde_json::Value) -> Self {
        Self {
            status,
            body: body.to_string(),
            delay_ms: 0,
        }
    }

    pub fn text(status: u16, body: &str) -> Self {
        Self {
            status,
            body: body.to_string(),
            delay_ms: 0,
        }
    }

    pub fn delayed(mut self, delay_ms: u64) -> Self {
        self.delay_ms = delay_ms;
        self
    }

    async fn respond(&self) -> HttpResponse {
        if self.delay_ms > 0 {
            actix_web::rt::time::sleep(std::time::Duration::from_millis(self.delay_ms)).await;
        }
        let status = actix_web::http::StatusCode::from_u16(self.status).unwrap();
        HttpResponse::build(status)
            .content_type("application/json")
            .body(self.body.clone())
    }
}

/// Gemini-shaped success body wrapping `text`.
pub fn gemini_reply(text: &str) -> Reply {
    Reply::json(
        200,
        serde_json::json!({
            "candidates": [{ "content": { "parts": [{ "text": text }], "role": "model" } }]
        }),
    )
}

struct Replies {
    predict: Reply,
    report: Reply,
}

async fn predict(
    mut payload: Multipart,
    recorder: web::Data<Recorder>,
    replies: web::Data<Replies>,
) -> HttpResponse {
    let mut fields = Vec::new();
    while let Ok(Some(mut field)) = payload.try_next().await {
        let mut upload = ReceivedUpload {
            field: field.name().unwrap_or_default().to_string(),
            file_name: field
                .content_disposition()
                .and_then(|cd| cd.get_filename())
                .map(str::to_string),
            content_type: field.content_type().map(|mime| mime.to_string()),
            bytes: Vec::new(),
        };
        while let Some(Ok(chunk)) = field.next().await {
            upload.bytes.extend_from_slice(&chunk);
        }
        fields.push(upload);
    }
    recorder.uploads.lock().unwrap().push(fields);
    replies.predict.respond().await
}

async fn generate(
    request: actix_web::HttpRequest,
    body: web::Json<serde_json::Value>,
    recorder: web::Data<Recorder>,
    replies: web::Data<Replies>,
) -> HttpResponse {
    let body = body.into_inner();
    let prompt = body["contents"][0]["parts"][0]["text"]
        .as_str()
        .unwrap_or_default()
        .to_string();
    recorder.prompts.lock().unwrap().push(prompt);
    recorder.api_keys.lock().unwrap().push(
        request
            .headers()
            .get("x-goog-api-key")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    );
    replies.report.respond().await
}

/// Mock classification + report services on one ephemeral port.
pub struct MockServices {
    pub base_url: String,
    pub recorder: Arc<Recorder>,
    handle: ServerHandle,
}

impl MockServices {
    pub async fn start(predict_reply: Reply, report_reply: Reply) -> Self {
        let recorder = Arc::new(Recorder::default());
        let replies = Arc::new(Replies {
            predict: predict_reply,
            report: report_reply,
        });

        let data_recorder = web::Data::from(recorder.clone());
        let data_replies = web::Data::from(replies);
        let server = HttpServer::new(move || {
            App::new()
                .app_data(data_recorder.clone())
                .app_data(data_replies.clone())
                .route("/predict", web::post().to(predict))
                .route(
                    "/v1beta/models/{model_action}",
                    web::post().to(generate),
                )
        })
        .workers(1)
        .bind(("127.0.0.1", 0))
        .unwrap();

        let addr = server.addrs()[0];
        let server = server.run();
        let handle = server.handle();
        actix_web::rt::spawn(server);

        Self {
            base_url: format!("http://{}", addr),
            recorder,
            handle,
        }
    }

    pub fn predict_url(&self) -> Url {
        Url::parse(&format!("{}/predict", self.base_url)).unwrap()
    }

    pub fn report_config(&self, api_key: Option<&str>) -> ReportConfig {
        ReportConfig {
            base_url: Url::parse(&self.base_url).unwrap(),
            model: "gemini-1.5-flash".to_string(),
            api_key: api_key.map(str::to_string),
        }
    }

    pub async fn stop(self) {
        self.handle.stop(false).await;
    }
}

/// A URL nothing is listening on.
pub fn closed_port_url() -> Url {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    Url::parse(&format!("http://{}/predict", addr)).unwrap()
}
