//! Shared fixtures: a stub Spamhaus upstream and an exposition-text reader.

#![allow(dead_code)]

use std::collections::{BTreeSet, HashMap};
use std::convert::Infallible;
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Request, Response, Server, StatusCode};

use spamhaus_exporter::config::Settings;
use spamhaus_exporter::fetcher::SpamhausClient;
use spamhaus_exporter::probe::Prober;

pub const EXAMPLE_OVERVIEW: &str =
    r#"{"score":7.2,"dimensions":{"human":1.0,"identity":2.0,"infra":3.0,"malware":4.0,"smtp":5.0}}"#;

pub const OTHER_OVERVIEW: &str =
    r#"{"score":-3.5,"dimensions":{"human":-1.0,"identity":0.5,"infra":0.0,"malware":-2.0,"smtp":1.5}}"#;

pub const HTML_PAGE: &str = "<html><body><h1>403 Forbidden</h1></body></html>";

/// Serve `bodies` (domain → raw body) under `/domain/<d>/overview`. Unknown
/// domains get an HTML 404 page, as the real upstream does.
pub fn spawn_upstream(bodies: &[(&str, &str)]) -> String {
    spawn_slow_upstream(bodies, Duration::ZERO)
}

/// Like [`spawn_upstream`], but every response is held back by `delay`.
pub fn spawn_slow_upstream(bodies: &[(&str, &str)], delay: Duration) -> String {
    let bodies: Arc<HashMap<String, String>> = Arc::new(
        bodies
            .iter()
            .map(|(d, b)| (d.to_string(), b.to_string()))
            .collect(),
    );

    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.set_nonblocking(true).unwrap();
    let addr = listener.local_addr().unwrap();

    let make_svc = make_service_fn(move |_conn| {
        let bodies = Arc::clone(&bodies);
        async move {
            Ok::<_, Infallible>(service_fn(move |req: Request<Body>| {
                let bodies = Arc::clone(&bodies);
                async move {
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    let domain = req
                        .uri()
                        .path()
                        .trim_start_matches("/domain/")
                        .trim_end_matches("/overview")
                        .to_string();
                    let resp = match bodies.get(&domain) {
                        Some(body) => Response::new(Body::from(body.clone())),
                        None => {
                            let mut resp = Response::new(Body::from(
                                "<html><body>Not Found</body></html>",
                            ));
                            *resp.status_mut() = StatusCode::NOT_FOUND;
                            resp
                        }
                    };
                    Ok::<_, Infallible>(resp)
                }
            }))
        }
    });

    tokio::spawn(Server::from_tcp(listener).unwrap().serve(make_svc));
    format!("http://{addr}/domain/")
}

/// An upstream URL nothing is listening on.
pub fn dead_upstream() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}/domain/")
}

/// In-memory sink for a `tracing_subscriber::fmt` writer.
#[derive(Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl std::io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Route this thread's events at ERROR and above into `buffer` until the
/// guard is dropped.
pub fn capture_errors(buffer: &LogBuffer) -> tracing::subscriber::DefaultGuard {
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::ERROR)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    tracing::subscriber::set_default(subscriber)
}

pub fn settings(upstream_url: String) -> Settings {
    Settings {
        listen_address: "0".into(),
        upstream_url,
        upstream_timeout: None,
    }
}

pub fn prober(upstream_url: String) -> Prober {
    let client = SpamhausClient::new(&settings(upstream_url)).unwrap();
    Prober::new(client).unwrap()
}

pub fn targets(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

/// One sample line: metric name, label set, value.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub name: String,
    pub labels: BTreeSet<(String, String)>,
    pub value: f64,
}

/// Parse the sample lines of a text exposition, skipping `# HELP`/`# TYPE`.
pub fn samples(text: &str) -> Vec<Sample> {
    text.lines()
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(|line| {
            let (series, value) = line.rsplit_once(' ').unwrap();
            let (name, labels) = match series.split_once('{') {
                Some((name, rest)) => {
                    let inner = rest.trim_end_matches('}');
                    let labels = inner
                        .split(',')
                        .filter(|p| !p.is_empty())
                        .map(|pair| {
                            let (k, v) = pair.split_once('=').unwrap();
                            (k.to_string(), v.trim_matches('"').to_string())
                        })
                        .collect();
                    (name.to_string(), labels)
                }
                None => (series.to_string(), BTreeSet::new()),
            };
            Sample { name, labels, value: value.parse().unwrap() }
        })
        .collect()
}

/// Value of the series `name{labels}`, if present.
pub fn sample_value(text: &str, name: &str, labels: &[(&str, &str)]) -> Option<f64> {
    let wanted: BTreeSet<(String, String)> = labels
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    samples(text)
        .into_iter()
        .find(|s| s.name == name && s.labels == wanted)
        .map(|s| s.value)
}

/// Distinct `domain` label values across both score families.
pub fn domains(text: &str) -> BTreeSet<String> {
    samples(text)
        .into_iter()
        .filter(|s| s.name.starts_with("spamhaus_score"))
        .flat_map(|s| {
            s.labels
                .into_iter()
                .filter(|(k, _)| k == "domain")
                .map(|(_, v)| v)
        })
        .collect()
}
