//! HTTP front end: listener, per-connection workers and the request
//! router.
//!
//! Concurrency lives at the network layer only: the listener accepts
//! connections and hands each one to a worker thread, inside which
//! every pipeline step is a blocking synchronous call.
//!
//! The router guarantees a terminal response for every accepted
//! request. Pipeline failures are converted to an in-page error
//! fragment at HTTP status 200; the only protocol-level errors are 404
//! for unknown routes and 400 for requests whose framing never reached
//! the router.

mod request;

pub use request::{parse_form, read_request, RequestContext, RequestError};

use std::io::Write;
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;

use crate::adapters::render;
use crate::application::PredictService;
use crate::config::Config;
use crate::ports::ArtifactStore;

/// One outbound HTTP response.
#[derive(Debug)]
pub struct Response {
    pub status: u16,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

impl Response {
    fn html(body: String) -> Self {
        Self {
            status: 200,
            content_type: "text/html; charset=utf-8",
            body: body.into_bytes(),
        }
    }

    fn not_found() -> Self {
        Self {
            status: 404,
            content_type: "text/plain; charset=utf-8",
            body: b"Ruta no encontrada".to_vec(),
        }
    }

    fn bad_request() -> Self {
        Self {
            status: 400,
            content_type: "text/plain; charset=utf-8",
            body: "Solicitud inválida".as_bytes().to_vec(),
        }
    }

    fn unavailable() -> Self {
        Self {
            status: 500,
            content_type: "text/plain; charset=utf-8",
            body: b"Plantilla no disponible".to_vec(),
        }
    }

    fn reason(&self) -> &'static str {
        match self.status {
            200 => "OK",
            400 => "Bad Request",
            404 => "Not Found",
            _ => "Internal Server Error",
        }
    }

    fn write_to<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        write!(
            writer,
            "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            self.status,
            self.reason(),
            self.content_type,
            self.body.len()
        )?;
        writer.write_all(&self.body)?;
        writer.flush()
    }
}

/// The serving loop: router plus listener for one deployment.
pub struct HttpServer<S: ArtifactStore> {
    config: Config,
    service: PredictService<S>,
}

impl<S: ArtifactStore + 'static> HttpServer<S> {
    /// Build a server for the configured deployment over the given
    /// artifact store.
    #[must_use]
    pub fn new(config: Config, store: Arc<S>) -> Self {
        let service = PredictService::new(store, config.deployment.schema.clone());
        Self { config, service }
    }

    /// Bind the configured port and serve until the process exits.
    ///
    /// # Errors
    /// Returns error if the listening socket cannot be bound.
    pub fn run(self) -> crate::Result<()> {
        let listener = TcpListener::bind(("0.0.0.0", self.config.port))?;
        tracing::info!(
            "Servidor corriendo en http://localhost:{} (deployment={})",
            self.config.port,
            self.config.deployment.name
        );
        self.serve(listener)?;
        Ok(())
    }

    /// Serve connections from an already-bound listener.
    pub fn serve(self, listener: TcpListener) -> std::io::Result<()> {
        let server = Arc::new(self);
        for stream in listener.incoming() {
            match stream {
                Ok(stream) => {
                    let server = Arc::clone(&server);
                    thread::spawn(move || server.handle_connection(stream));
                }
                Err(e) => tracing::warn!("Accept failed: {e}"),
            }
        }
        Ok(())
    }

    fn handle_connection(&self, mut stream: TcpStream) {
        let response = match read_request(&mut stream) {
            Ok(ctx) => self.handle_request(&ctx),
            Err(err) => {
                tracing::debug!("Unparseable request: {err}");
                Response::bad_request()
            }
        };

        if let Err(e) = response.write_to(&mut stream) {
            tracing::debug!("Failed to write response: {e}");
        }
    }

    /// Route one framed request to a terminal response.
    ///
    /// Every path through here ends in a response; no error from the
    /// pipeline propagates past this boundary.
    pub fn handle_request(&self, ctx: &RequestContext) -> Response {
        match (ctx.method.as_str(), ctx.route_path()) {
            ("GET", "/") | ("GET", "/index.html") => self.serve_template(),
            ("POST", "/predict") => self.serve_prediction(ctx),
            _ => Response::not_found(),
        }
    }

    fn serve_template(&self) -> Response {
        match std::fs::read_to_string(&self.config.deployment.template_path) {
            Ok(template) => Response::html(template),
            Err(e) => {
                tracing::error!(
                    "Template '{}' unreadable: {e}",
                    self.config.deployment.template_path.display()
                );
                Response::unavailable()
            }
        }
    }

    fn serve_prediction(&self, ctx: &RequestContext) -> Response {
        let fields = parse_form(&ctx.body);

        let fragment = match self.service.run(&fields) {
            Ok(result) => render::success_fragment(&result),
            Err(err) => {
                if err.is_deployment_fault() {
                    tracing::error!("Deployment fault: {err}");
                } else {
                    // Routine user-input rejection, not a fault.
                    tracing::debug!("Rejected input: {err}");
                }
                render::error_fragment(&err)
            }
        };

        let deployment = &self.config.deployment;
        let page = match std::fs::read_to_string(&deployment.template_path) {
            Ok(template) => match render::render(&template, deployment.marker, &fragment) {
                Ok(page) => page,
                Err(err) => {
                    tracing::error!("Deployment fault: {err}");
                    render::fallback_page(&render::error_fragment(&err))
                }
            },
            Err(e) => {
                tracing::error!(
                    "Template '{}' unreadable: {e}",
                    deployment.template_path.display()
                );
                render::fallback_page(&fragment)
            }
        };

        Response::html(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::FsArtifactStore;
    use crate::config::{Deployment, DEFAULT_MARKER};
    use crate::domain::{FeatureSchema, FieldSpec};
    use std::io::Read;

    const SALARIO_MODEL: &str = r#"{
        "name": "modelo_salario",
        "kind": "linear_regression",
        "feature_names": ["anios"],
        "coefficients": [5000.0],
        "intercept": 20000.0
    }"#;

    const COMPRA_MODEL: &str = r#"{
        "name": "modelo_compra",
        "kind": "logistic_regression",
        "feature_names": ["edad", "salario"],
        "coefficients": [0.0, 0.0],
        "intercept": -0.8472978603872034,
        "class_labels": ["No compraría", "Compraría"]
    }"#;

    const IDENTITY_SCALER: &str = r#"{"mean": [0.0, 0.0], "scale": [1.0, 1.0]}"#;

    fn template() -> String {
        format!("<html><body><form></form>{DEFAULT_MARKER}</body></html>")
    }

    struct Fixture {
        server: HttpServer<FsArtifactStore>,
        _dir: tempfile::TempDir,
    }

    fn fixture(model_json: &str, scaler_json: Option<&str>, schema: FeatureSchema) -> Fixture {
        let dir = tempfile::tempdir().expect("Should create tempdir");
        let model_path = dir.path().join("model.json");
        std::fs::write(&model_path, model_json).expect("Should write model");

        let scaler_path = scaler_json.map(|json| {
            let path = dir.path().join("scaler.json");
            std::fs::write(&path, json).expect("Should write scaler");
            path
        });

        let template_path = dir.path().join("index.html");
        std::fs::write(&template_path, template()).expect("Should write template");

        let deployment = Deployment {
            name: "test",
            schema,
            model_path: model_path.clone(),
            scaler_path,
            template_path,
            marker: DEFAULT_MARKER,
        };
        let store = Arc::new(FsArtifactStore::new(model_path, deployment.scaler_path.clone()));
        let config = Config {
            port: 0,
            deployment,
        };

        Fixture {
            server: HttpServer::new(config, store),
            _dir: dir,
        }
    }

    fn salario_fixture() -> Fixture {
        fixture(
            SALARIO_MODEL,
            None,
            FeatureSchema::new(vec![FieldSpec::numeric("anios")]),
        )
    }

    fn post(body: &str) -> RequestContext {
        RequestContext {
            method: "POST".into(),
            path: "/predict".into(),
            body: body.as_bytes().to_vec(),
        }
    }

    fn get(path: &str) -> RequestContext {
        RequestContext {
            method: "GET".into(),
            path: path.into(),
            body: vec![],
        }
    }

    fn body_text(response: &Response) -> String {
        String::from_utf8_lossy(&response.body).into_owned()
    }

    #[test]
    fn test_get_serves_template_with_marker_intact() {
        let fixture = salario_fixture();
        let response = fixture.server.handle_request(&get("/"));

        assert_eq!(response.status, 200);
        assert!(body_text(&response).contains(DEFAULT_MARKER));
    }

    #[test]
    fn test_salario_prediction_renders_formatted_value() {
        let fixture = salario_fixture();
        let response = fixture.server.handle_request(&post("anios=5.0"));

        assert_eq!(response.status, 200);
        let body = body_text(&response);
        assert!(body.contains("45,000.00"));
        assert!(!body.contains(DEFAULT_MARKER));
    }

    #[test]
    fn test_compra_prediction_renders_label_and_probability() {
        let fixture = fixture(
            COMPRA_MODEL,
            Some(IDENTITY_SCALER),
            FeatureSchema::new(vec![
                FieldSpec::numeric("edad"),
                FieldSpec::numeric("salario"),
            ]),
        );
        let response = fixture
            .server
            .handle_request(&post("edad=30&salario=50000.0"));

        assert_eq!(response.status, 200);
        let body = body_text(&response);
        assert!(body.contains("No compraría"));
        assert!(body.contains("30.0%"));
    }

    #[test]
    fn test_missing_field_is_an_in_page_error_at_200() {
        let fixture = salario_fixture();
        let response = fixture.server.handle_request(&post(""));

        assert_eq!(response.status, 200);
        let body = body_text(&response);
        assert!(body.contains("Error"));
        assert!(body.contains("anios"));
    }

    #[test]
    fn test_missing_artifact_is_an_in_page_error_at_200() {
        let fixture = salario_fixture();
        std::fs::remove_file(&fixture.server.config.deployment.model_path)
            .expect("Should remove model");

        let response = fixture.server.handle_request(&post("anios=5.0"));
        assert_eq!(response.status, 200);
        assert!(body_text(&response).contains("Error"));
    }

    #[test]
    fn test_unknown_route_is_404() {
        let fixture = salario_fixture();
        assert_eq!(fixture.server.handle_request(&get("/nope")).status, 404);

        // Wrong method on a known path is equally unroutable.
        let delete = RequestContext {
            method: "DELETE".into(),
            path: "/predict".into(),
            body: vec![],
        };
        assert_eq!(fixture.server.handle_request(&delete).status, 404);
    }

    #[test]
    fn test_template_without_marker_falls_back_in_page() {
        let fixture = salario_fixture();
        std::fs::write(
            &fixture.server.config.deployment.template_path,
            "<html><body>sin marcador</body></html>",
        )
        .expect("Should overwrite template");

        let response = fixture.server.handle_request(&post("anios=5.0"));
        assert_eq!(response.status, 200);
        assert!(body_text(&response).contains("Error"));
    }

    #[test]
    fn test_end_to_end_over_a_socket() {
        let fixture = salario_fixture();
        let listener = TcpListener::bind("127.0.0.1:0").expect("Should bind");
        let addr = listener.local_addr().expect("Should have addr");
        thread::spawn(move || {
            let Fixture { server, _dir } = fixture;
            let _ = server.serve(listener);
        });

        let mut stream = TcpStream::connect(addr).expect("Should connect");
        stream
            .write_all(
                b"POST /predict HTTP/1.1\r\nHost: localhost\r\nContent-Length: 9\r\n\r\nanios=5.0",
            )
            .expect("Should send request");

        let mut raw = String::new();
        stream
            .read_to_string(&mut raw)
            .expect("Should read response");
        assert!(raw.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(raw.contains("45,000.00"));

        let mut stream = TcpStream::connect(addr).expect("Should connect");
        stream
            .write_all(b"GET /nope HTTP/1.1\r\nHost: localhost\r\n\r\n")
            .expect("Should send request");
        let mut raw = String::new();
        stream
            .read_to_string(&mut raw)
            .expect("Should read response");
        assert!(raw.starts_with("HTTP/1.1 404"));
    }

    #[test]
    fn test_concurrent_first_requests_share_one_artifact_load() {
        let fixture = salario_fixture();
        let store = Arc::new(FsArtifactStore::new(
            fixture.server.config.deployment.model_path.clone(),
            None,
        ));
        let server = Arc::new(HttpServer::new(
            Config {
                port: 0,
                deployment: fixture.server.config.deployment.clone(),
            },
            Arc::clone(&store),
        ));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let server = Arc::clone(&server);
                thread::spawn(move || server.handle_request(&post("anios=5.0")))
            })
            .collect();

        for handle in handles {
            let response = handle.join().expect("Thread should not panic");
            assert_eq!(response.status, 200);
            assert!(body_text(&response).contains("45,000.00"));
        }
        assert_eq!(store.disk_reads(), 1);
    }

    #[test]
    fn test_fixture_paths_are_absolute() {
        // Guards the fixtures themselves: relative paths would resolve
        // against the test runner's working directory.
        let fixture = salario_fixture();
        assert!(fixture.server.config.deployment.model_path.is_absolute());
    }
}
