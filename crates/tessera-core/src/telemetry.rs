//! Best-effort page telemetry.
//!
//! A [`Telemetry`] instance makes one sampling decision per page: with
//! weight `w` (1 when the page URL carries `rum=on`, otherwise the
//! configured default) a page is selected with probability `1/w`.  Selected
//! pages send a JSON beacon per checkpoint through the host's
//! [`BeaconSink`].
//!
//! Telemetry is never on the critical path.  [`Telemetry::sample`] does not
//! return errors; every failure is logged at `trace` and dropped.
//!
//! It also owns the two late-binding hooks of the page:
//! - the deferred-call [`TopicBus`] (`observe`, `cwv`, …);
//! - the one-shot enhancement hook fired by the page loader after the first
//!   section is ready ([`Telemetry::enhance`]).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::RwLock;
use serde_json::{Map, Value, json};
use tracing::{debug, trace};
use uuid::Uuid;

use crate::dom::Document;
use crate::host::{BeaconSink, PageLocation};
use crate::topic::{TopicBus, TopicHandler};

/// Topics declared on every page.
pub const DEFERRED_TOPICS: [&str; 2] = ["observe", "cwv"];

/// Handler for a checkpoint.
pub type CheckpointHandler = Arc<dyn Fn(&Value) + Send + Sync>;

/// One-shot enhancement handler.
pub type EnhanceHandler = Arc<dyn Fn() + Send + Sync>;

/// Sampling configuration.
#[derive(Debug, Clone)]
pub struct SamplingSettings {
    /// Master switch.  When `false` no page is ever selected.
    pub enabled: bool,
    /// Weight used when the page URL does not force sampling.
    pub default_weight: u32,
    /// Base URL beacons are sent to (`<base>/.rum/<weight>`).
    pub collect_base_url: String,
    /// Script inserted on the `lazy` checkpoint of selected pages.
    pub enhancer_url: Option<String>,
    /// Free-form generation tag attached to every beacon.
    pub generation: Option<String>,
}

impl Default for SamplingSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            default_weight: 100,
            collect_base_url: "https://rum.hlx.page".to_string(),
            enhancer_url: None,
            generation: None,
        }
    }
}

/// The per-page sampling decision.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub weight: u32,
    pub id: String,
    pub random: f64,
    pub is_selected: bool,
}

impl Sample {
    fn draw(href: &str, weight: u32, enabled: bool) -> Self {
        let random = unit_interval(Uuid::new_v4());
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        let suffix = Uuid::new_v4().simple().to_string();
        let id = format!("{}-{}-{}", hash_code(href), millis, &suffix[..14]);
        Self {
            weight,
            id,
            random,
            is_selected: enabled && random * f64::from(weight) < 1.0,
        }
    }
}

/// Maps a random UUID onto `[0, 1)` using its top 53 bits.
fn unit_interval(uuid: Uuid) -> f64 {
    let bits = (uuid.as_u128() >> 75) as u64;
    bits as f64 / (1u64 << 53) as f64
}

/// 32-bit rolling string hash (`h = h * 31 + c`, wrapping).
fn hash_code(s: &str) -> i32 {
    s.encode_utf16()
        .fold(0i32, |h, c| h.wrapping_shl(5).wrapping_sub(h).wrapping_add(i32::from(c)))
}

struct TelemetryInner {
    document: Document,
    location: Option<PageLocation>,
    settings: SamplingSettings,
    sample: Sample,
    sink: Option<Arc<dyn BeaconSink>>,
    bus: TopicBus,
    cases: RwLock<HashMap<String, CheckpointHandler>>,
    always: RwLock<HashMap<String, CheckpointHandler>>,
    enhancer: RwLock<Option<EnhanceHandler>>,
}

/// Page telemetry handle.  Cheap to clone.
#[derive(Clone)]
pub struct Telemetry {
    inner: Arc<TelemetryInner>,
}

impl Telemetry {
    /// Creates the page's telemetry and draws its sample.
    pub fn new(
        document: Document,
        location: Option<PageLocation>,
        settings: SamplingSettings,
        sink: Option<Arc<dyn BeaconSink>>,
    ) -> Self {
        let forced = location.as_ref().is_some_and(|l| l.flag("rum"));
        let weight = if forced { 1 } else { settings.default_weight.max(1) };
        let href = location.as_ref().map(PageLocation::href).unwrap_or_default();
        let sample = Sample::draw(href, weight, settings.enabled);
        debug!(
            weight = sample.weight,
            id = %sample.id,
            selected = sample.is_selected,
            "Telemetry sample drawn"
        );

        let bus = TopicBus::new();
        for topic in DEFERRED_TOPICS {
            bus.declare(topic);
        }

        Self {
            inner: Arc::new(TelemetryInner {
                document,
                location,
                settings,
                sample,
                sink,
                bus,
                cases: RwLock::new(HashMap::new()),
                always: RwLock::new(HashMap::new()),
                enhancer: RwLock::new(None),
            }),
        }
    }

    /// Telemetry that never selects the page.  Deferred topics and the
    /// enhancement hook still work.
    pub fn disabled(document: Document) -> Self {
        let settings = SamplingSettings {
            enabled: false,
            ..SamplingSettings::default()
        };
        Self::new(document, None, settings, None)
    }

    /// The sampling decision for this page.
    pub fn sample_info(&self) -> &Sample {
        &self.inner.sample
    }

    /// The deferred-call topics.
    pub fn bus(&self) -> &TopicBus {
        &self.inner.bus
    }

    /// Shorthand for `bus().call(topic, args)`.
    pub fn call(&self, topic: &str, args: Value) {
        self.inner.bus.call(topic, args);
    }

    /// Shorthand for `bus().bind(topic, handler)`.
    pub fn bind(&self, topic: &str, handler: TopicHandler) {
        self.inner.bus.bind(topic, handler);
    }

    /// Registers a handler run for `checkpoint` on selected pages, replacing
    /// the built-in behavior for that checkpoint.
    pub fn on(&self, checkpoint: &str, handler: CheckpointHandler) {
        self.inner.cases.write().insert(checkpoint.to_string(), handler);
    }

    /// Registers a handler run for `checkpoint` on every page.
    pub fn always_on(&self, checkpoint: &str, handler: CheckpointHandler) {
        self.inner
            .always
            .write()
            .insert(checkpoint.to_string(), handler);
    }

    /// Installs the enhancement handler.
    pub fn set_enhancer(&self, handler: EnhanceHandler) {
        *self.inner.enhancer.write() = Some(handler);
    }

    /// Invokes the enhancement handler if one is installed.  Returns `true`
    /// when it ran.
    pub fn enhance(&self) -> bool {
        let handler = self.inner.enhancer.read().clone();
        match handler {
            Some(handler) => {
                handler();
                true
            }
            None => false,
        }
    }

    /// Records `checkpoint`.
    pub fn sample(&self, checkpoint: &str, data: Value) {
        let inner = &self.inner;
        if inner.sample.is_selected {
            self.send_ping(checkpoint, &data);
            let custom = inner.cases.read().get(checkpoint).cloned();
            match (custom, checkpoint) {
                (Some(handler), _) => handler(&data),
                (None, "cwv") => inner.bus.call("cwv", data.clone()),
                (None, "lazy") => self.insert_enhancer(),
                _ => {}
            }
        }
        let always = inner.always.read().get(checkpoint).cloned();
        if let Some(handler) = always {
            handler(&data);
        }
    }

    fn send_ping(&self, checkpoint: &str, data: &Value) {
        let inner = &self.inner;
        let Some(sink) = &inner.sink else {
            return;
        };
        let mut body = Map::new();
        body.insert("weight".into(), json!(inner.sample.weight));
        body.insert("id".into(), json!(inner.sample.id));
        body.insert(
            "referer".into(),
            json!(inner.location.as_ref().map(PageLocation::href)),
        );
        body.insert("generation".into(), json!(inner.settings.generation));
        body.insert("checkpoint".into(), json!(checkpoint));
        if let Value::Object(extra) = data {
            body.extend(extra.clone());
        }
        let url = format!(
            "{}/.rum/{}",
            inner.settings.collect_base_url.trim_end_matches('/'),
            inner.sample.weight
        );
        match sink.send(&url, &Value::Object(body)) {
            Ok(()) => trace!(checkpoint, "Telemetry ping sent"),
            Err(e) => trace!(checkpoint, error = %e, "Telemetry ping dropped"),
        }
    }

    fn insert_enhancer(&self) {
        let inner = &self.inner;
        let url = inner.settings.enhancer_url.clone().unwrap_or_else(|| {
            format!(
                "{}/.rum/@adobe/helix-rum-enhancer@^1/src/index.js",
                inner.settings.collect_base_url.trim_end_matches('/')
            )
        });
        if inner.document.insert_head_resource("script", "src", &url, &[]) {
            trace!(url = %url, "Inserted telemetry enhancer");
        }
    }
}
