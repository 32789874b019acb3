//! Prometheus metrics for the auction engine.
//!
//! [`MetricsRegistry`] owns the Prometheus registry together with the
//! strongly-typed [`AuctionMetrics`] handles the engine updates.
//! [`serve_metrics`] exposes the registry over HTTP in the text
//! exposition format; anything that is not `GET /metrics` gets a 404.

use std::{convert::Infallible, net::SocketAddr, sync::Arc};

use bytes::Bytes;
use http_body_util::Full;
use hyper::{
    header::{self, HeaderValue},
    server::conn::http1,
    service::service_fn,
    Method, Request, Response, StatusCode,
};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;

use prometheus::{Encoder, Gauge, Histogram, HistogramOpts, IntCounter, Opts, Registry, TextEncoder};

/// Auction-related Prometheus metrics.
///
/// These are registered into a [`Registry`] and can be updated from the
/// engine and handler code.
#[derive(Clone)]
pub struct AuctionMetrics {
    /// Wall-clock duration of a full auction in `prepare_proposal`.
    pub auction_duration_seconds: Histogram,
    /// Total bids that passed validation across all auctions.
    pub bids_received: IntCounter,
    /// Auctions that fell back to the default response.
    pub auctions_defaulted: IntCounter,
    /// Payment amount of the most recent winning bid, in base denom units.
    pub winning_payment: Gauge,
}

impl AuctionMetrics {
    /// Registers auction metrics into the given `Registry`.
    pub fn register(registry: &Registry) -> Result<Self, prometheus::Error> {
        let auction_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "auction_duration_seconds",
                "Wall-clock duration of a full block auction in seconds",
            )
            .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.0, 3.0, 5.0]),
        )?;
        registry.register(Box::new(auction_duration_seconds.clone()))?;

        let bids_received = IntCounter::with_opts(Opts::new(
            "auction_bids_received",
            "Total number of bids that passed validation",
        ))?;
        registry.register(Box::new(bids_received.clone()))?;

        let auctions_defaulted = IntCounter::with_opts(Opts::new(
            "auction_auctions_defaulted",
            "Total number of auctions that fell back to the default response",
        ))?;
        registry.register(Box::new(auctions_defaulted.clone()))?;

        let winning_payment = Gauge::with_opts(Opts::new(
            "auction_winning_payment",
            "Payment amount of the most recent winning bid, in base denom units",
        ))?;
        registry.register(Box::new(winning_payment.clone()))?;

        Ok(Self {
            auction_duration_seconds,
            bids_received,
            auctions_defaulted,
            winning_payment,
        })
    }
}

/// The Prometheus registry plus the auction metric handles.
///
/// One of these exists per process, wrapped in an [`Arc`] and shared
/// between the engine and the exporter task.
#[derive(Clone)]
pub struct MetricsRegistry {
    registry: Registry,
    pub auction: AuctionMetrics,
}

impl MetricsRegistry {
    /// Creates a registry with the auction metrics already registered.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();
        let auction = AuctionMetrics::register(&registry)?;
        Ok(Self { registry, auction })
    }

    /// Renders every registered metric in the text exposition format.
    pub fn gather_text(&self) -> String {
        let mut buffer = Vec::new();
        if let Err(e) = TextEncoder::new().encode(&self.registry.gather(), &mut buffer) {
            tracing::error!(err = %e, "failed to encode Prometheus metrics");
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

/// Builds the HTTP response for one exporter request.
///
/// Split out from the connection handling (and generic over the request
/// body) so the routing can be exercised without a socket.
fn render<B>(metrics: &MetricsRegistry, req: &Request<B>) -> Response<Full<Bytes>> {
    if req.method() != Method::GET || req.uri().path() != "/metrics" {
        let mut res = Response::new(Full::new(Bytes::from_static(b"not found")));
        *res.status_mut() = StatusCode::NOT_FOUND;
        return res;
    }

    let mut res = Response::new(Full::new(Bytes::from(metrics.gather_text())));
    res.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; version=0.0.4"),
    );
    res
}

/// Serves `GET /metrics` on `addr` until the task is dropped.
///
/// Intended to be spawned next to the engine:
///
/// ```ignore
/// let registry = Arc::new(MetricsRegistry::new()?);
/// if let Some(addr) = cfg.metrics.listen_addr {
///     tokio::spawn(serve_metrics(registry.clone(), addr));
/// }
/// ```
pub async fn serve_metrics(
    metrics: Arc<MetricsRegistry>,
    addr: SocketAddr,
) -> Result<(), std::io::Error> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "metrics exporter listening");

    loop {
        let (stream, peer) = listener.accept().await?;
        let metrics = metrics.clone();

        tokio::spawn(async move {
            let service = service_fn(move |req| {
                let res = render(&metrics, &req);
                async move { Ok::<_, Infallible>(res) }
            });

            if let Err(err) = http1::Builder::new()
                .serve_connection(TokioIo::new(stream), service)
                .await
            {
                tracing::debug!(%peer, err = %err, "metrics connection error");
            }
        });
    }
}
