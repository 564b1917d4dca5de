//! The associative store and retrieval engine.
//!
//! Chunks are decomposed into open n-grams, rendered into composite trace
//! vectors, and superimposed into per-token accumulators. Retrieval ranks
//! every accumulator by cosine similarity to a query built the same way,
//! converts the winning similarity into a latency, and hands the host a
//! one-shot completion to fire after that delay in simulated time.
//!
//! The store never blocks and owns no scheduler: `add`/`request` do their
//! algebra synchronously and return a [`RequestHandle`]; the host calls
//! [`DeclarativeMemory::on_timer`] once the delay has elapsed. A handle
//! whose generation has been superseded by a later call completes as
//! [`Completion::Superseded`] with no observable effect.

use crate::chunk::{Bindings, Chunk, ChunkInput, ValueExpr};
use crate::error::{MemoryError, MemoryResult};
use crate::gram::{unconstrained_context, windowed_context};
use crate::hrr::{Hrr, DEFAULT_DIM};
use crate::symbols::SymbolSpace;
use crate::timing::{retrieval_latency, ActivationScale, Clock, Finst};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, trace};

/// Which gram decomposition the encoder uses.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GramMode {
    /// Explicit enumeration of single-gap open n-grams, capped at
    /// `max_gram_size`.
    #[default]
    Windowed,
    /// A left-to-right fold over every placeholder-containing subsequence,
    /// with no size cap. O(L) convolutions per position; preferred for long
    /// records.
    Unconstrained,
}

/// Construction parameters for a [`DeclarativeMemory`].
///
/// Deserializes from partial JSON: omitted fields take their defaults.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Vector dimensionality N. 64 to 2048 are used in the literature;
    /// smaller values introduce more retrieval noise.
    pub dim: usize,
    /// F in the reaction-time equation `F·e^(−activation)`.
    pub latency: f64,
    /// Minimum activation for a successful retrieval, on the configured
    /// activation scale.
    pub threshold: f64,
    /// Cap on any computed latency.
    pub maximum_time: f64,
    /// Capacity of the recency set.
    pub finst_size: usize,
    /// Residency time of a recency entry, in simulated seconds.
    pub finst_time: f64,
    /// Largest n-gram size encoded in [`GramMode::Windowed`].
    pub max_gram_size: usize,
    /// Retention factor applied to every accumulator on each `add`:
    /// 1 = no decay, 0 = total loss.
    pub forgetting: f64,
    /// Scale of time-driven Gaussian corruption of stored vectors;
    /// 0 disables aging.
    pub noise: f64,
    /// How cosines become activations (and how `threshold` is read).
    pub scale: ActivationScale,
    /// Gram decomposition strategy.
    pub gram_mode: GramMode,
    /// Seed for the store's random source; `None` draws from entropy.
    pub seed: Option<u64>,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        MemoryConfig {
            dim: DEFAULT_DIM,
            latency: 0.05,
            threshold: 0.1,
            maximum_time: 10.0,
            finst_size: 4,
            finst_time: 3.0,
            max_gram_size: 7,
            forgetting: 1.0,
            noise: 0.0,
            scale: ActivationScale::Cosine,
            gram_mode: GramMode::Windowed,
            seed: None,
        }
    }
}

/// Per-request options.
#[derive(Clone, Debug, Default)]
pub struct RequestOptions {
    /// Skip candidates still resident in the recency set.
    pub require_new: bool,
    /// Bindings for `?name` references in the request chunk.
    pub bindings: Bindings,
}

/// A successfully retrieved record and its activation.
#[derive(Clone, Debug, PartialEq)]
pub struct Retrieved {
    pub chunk: Chunk,
    pub activation: f64,
}

/// What a pending completion will do when it fires.
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    /// Place the record in the output buffer.
    Recall(Retrieved),
    /// Clear the buffer and raise the error flag.
    Fail,
}

/// A one-shot deferred completion: fire [`DeclarativeMemory::on_timer`]
/// with it after [`RequestHandle::delay`] has elapsed in simulated time.
#[derive(Clone, Debug, PartialEq)]
pub struct RequestHandle {
    generation: u64,
    delay: f64,
    outcome: Outcome,
}

impl RequestHandle {
    /// Seconds of simulated time until this completion should fire.
    pub fn delay(&self) -> f64 {
        self.delay
    }

    /// The effect this completion will have, unless superseded.
    pub fn outcome(&self) -> &Outcome {
        &self.outcome
    }

    /// True when the ranking already failed and the completion will only
    /// signal the failure.
    pub fn will_fail(&self) -> bool {
        matches!(self.outcome, Outcome::Fail)
    }
}

/// Result of firing a completion.
#[derive(Clone, Debug, PartialEq)]
pub enum Completion {
    /// The record was placed in the output buffer.
    Recalled(Retrieved),
    /// The buffer was cleared and the error flag raised.
    Failed,
    /// A later call superseded this completion; nothing happened.
    Superseded,
}

/// Holographic declarative memory: a single-threaded, best-effort
/// associative store over superposed trace vectors.
///
/// # Examples
///
/// ```
/// use holomem::{DeclarativeMemory, MemoryConfig, SimClock};
///
/// let clock = SimClock::new();
/// let config = MemoryConfig {
///     seed: Some(7),
///     ..MemoryConfig::default()
/// };
/// let mut memory = DeclarativeMemory::new(config, Box::new(clock.clone()));
///
/// memory.add("color:red size:big").unwrap();
/// let handle = memory.request("color:red size:?").unwrap();
///
/// clock.advance(handle.delay());
/// memory.on_timer(handle);
///
/// let recalled = memory.buffer().expect("retrieval succeeded");
/// assert_eq!(recalled.chunk.to_string(), "color:red size:big");
/// ```
pub struct DeclarativeMemory {
    config: MemoryConfig,
    symbols: SymbolSpace,
    memory: BTreeMap<String, Hrr>,
    finst: Finst,
    clock: Box<dyn Clock>,
    generation: u64,
    busy: bool,
    error: bool,
    buffer: Option<Retrieved>,
    last_aged: f64,
}

/// Per-position vectors of a resolved chunk, ready for gram construction.
struct Prepared {
    slotted: bool,
    val: Vec<Hrr>,
    ph: Vec<Hrr>,
}

impl DeclarativeMemory {
    /// Create a store with the given parameters and an injected clock.
    pub fn new(config: MemoryConfig, clock: Box<dyn Clock>) -> Self {
        let symbols = SymbolSpace::new(config.dim, config.seed);
        let finst = Finst::new(config.finst_size, config.finst_time);
        let last_aged = clock.now();
        DeclarativeMemory {
            config,
            symbols,
            memory: BTreeMap::new(),
            finst,
            clock,
            generation: 0,
            busy: false,
            error: false,
            buffer: None,
            last_aged,
        }
    }

    /// Store a chunk.
    ///
    /// Parses and normalizes the input, ages existing accumulators by noise,
    /// applies the forgetting factor, and superimposes one trace per open
    /// n-gram position. Never blocks and never fails at retrieval time; the
    /// only errors are malformed input.
    pub fn add<'a>(&mut self, chunk: impl Into<ChunkInput<'a>>) -> MemoryResult<()> {
        self.add_with(chunk, &Bindings::new())
    }

    /// [`add`](Self::add) with `?name` references resolved against
    /// `bindings`.
    pub fn add_with<'a>(
        &mut self,
        chunk: impl Into<ChunkInput<'a>>,
        bindings: &Bindings,
    ) -> MemoryResult<()> {
        let chunk = chunk.into().normalize(bindings)?;
        if chunk.placeholder_count() > 0 {
            return Err(MemoryError::PlaceholderInAdd);
        }
        self.error = false;
        self.generation += 1;
        self.age_by_noise();
        let prep = self.prepare(&chunk);
        if self.config.forgetting < 1.0 {
            let f = self.config.forgetting.max(0.0);
            for vec in self.memory.values_mut() {
                vec.scale(f);
            }
        }
        for (p, element) in chunk.elements().iter().enumerate() {
            let ctx = self.context_for(&prep, p);
            match &element.value {
                ValueExpr::Literal(token) => {
                    if let Some(acc) = self.memory.get_mut(token) {
                        acc.accumulate(&ctx);
                    }
                }
                ValueExpr::Negated(token) => {
                    if let Some(acc) = self.memory.get_mut(token) {
                        acc.retract(&ctx);
                    }
                }
                // placeholders rejected above, variables resolved away
                _ => {}
            }
        }
        debug!(chunk = %chunk, tokens = self.memory.len(), "stored chunk");
        Ok(())
    }

    /// Retrieve the best value for the single `?` in the chunk.
    ///
    /// Returns a [`RequestHandle`] the host fires after its delay. A chunk
    /// with no `?` delegates to [`resonance`](Self::resonance); more than
    /// one `?` is a validation error.
    pub fn request<'a>(
        &mut self,
        chunk: impl Into<ChunkInput<'a>>,
    ) -> MemoryResult<RequestHandle> {
        self.request_with(chunk, &RequestOptions::default())
    }

    /// [`request`](Self::request) with bindings and retrieval options.
    pub fn request_with<'a>(
        &mut self,
        chunk: impl Into<ChunkInput<'a>>,
        options: &RequestOptions,
    ) -> MemoryResult<RequestHandle> {
        let chunk = chunk.into().normalize(&options.bindings)?;
        if chunk.placeholder_count() > 1 {
            return Err(MemoryError::MultiplePlaceholders);
        }
        let p = match chunk.placeholder_position() {
            Some(p) => p,
            None => return self.resonance_resolved(chunk),
        };

        self.busy = true;
        self.error = false;
        self.generation += 1;
        self.age_by_noise();

        let inhibited = match &chunk.elements()[p].value {
            ValueExpr::Placeholder { exclude } => exclude.clone(),
            _ => Vec::new(),
        };
        let prep = self.prepare(&chunk);
        let query = self.context_for(&prep, p);
        let now = self.clock.now();

        let mut best: Option<(&str, f64)> = None;
        let finst = &mut self.finst;
        for (token, acc) in &self.memory {
            if inhibited.iter().any(|x| x == token) {
                continue;
            }
            if options.require_new && finst.contains(token, now) {
                continue;
            }
            let cosine = acc.compare(&query);
            trace!(token = %token, cosine, "candidate");
            if best.map_or(true, |(_, c)| cosine > c) {
                best = Some((token.as_str(), cosine));
            }
        }

        match best {
            Some((token, cosine))
                if self.config.scale.activation(cosine) > self.config.threshold =>
            {
                let token = token.to_string();
                let activation = self.config.scale.activation(cosine);
                let recalled = chunk.substitute_placeholder(&token);
                self.finst.note(&token, now);
                let delay = retrieval_latency(
                    self.config.latency,
                    activation,
                    self.config.maximum_time,
                );
                debug!(winner = %token, cosine, delay, "request matched");
                Ok(RequestHandle {
                    generation: self.generation,
                    delay,
                    outcome: Outcome::Recall(Retrieved {
                        chunk: recalled,
                        activation,
                    }),
                })
            }
            _ => {
                let delay = retrieval_latency(
                    self.config.latency,
                    self.config.threshold,
                    self.config.maximum_time,
                );
                debug!(chunk = %chunk, delay, "no candidate above threshold");
                Ok(RequestHandle {
                    generation: self.generation,
                    delay,
                    outcome: Outcome::Fail,
                })
            }
        }
    }

    /// Judge the familiarity ("coherence") of a complete chunk.
    ///
    /// For every element, the element-removed query is compared against that
    /// element's own accumulator; the chunk is recalled only when the mean
    /// of those cosines clears the threshold.
    pub fn resonance<'a>(
        &mut self,
        chunk: impl Into<ChunkInput<'a>>,
    ) -> MemoryResult<RequestHandle> {
        self.resonance_with(chunk, &Bindings::new())
    }

    /// [`resonance`](Self::resonance) with `?name` references resolved
    /// against `bindings`.
    pub fn resonance_with<'a>(
        &mut self,
        chunk: impl Into<ChunkInput<'a>>,
        bindings: &Bindings,
    ) -> MemoryResult<RequestHandle> {
        let chunk = chunk.into().normalize(bindings)?;
        self.resonance_resolved(chunk)
    }

    fn resonance_resolved(&mut self, chunk: Chunk) -> MemoryResult<RequestHandle> {
        if chunk.placeholder_count() > 0 {
            return Err(MemoryError::PlaceholderInResonance);
        }
        self.busy = true;
        self.error = false;
        self.generation += 1;
        self.age_by_noise();

        let prep = self.prepare(&chunk);
        let coherence = self.coherence_of(&chunk, &prep);
        let activation = self.config.scale.activation(coherence);
        debug!(chunk = %chunk, coherence, "resonance");

        if activation > self.config.threshold {
            let delay =
                retrieval_latency(self.config.latency, activation, self.config.maximum_time);
            Ok(RequestHandle {
                generation: self.generation,
                delay,
                outcome: Outcome::Recall(Retrieved { chunk, activation }),
            })
        } else {
            let delay = retrieval_latency(
                self.config.latency,
                self.config.threshold,
                self.config.maximum_time,
            );
            Ok(RequestHandle {
                generation: self.generation,
                delay,
                outcome: Outcome::Fail,
            })
        }
    }

    /// Similarity probe for external instrumentation: coherence of a
    /// complete chunk, or the best-match similarity of a single-`?` query,
    /// on the configured activation scale. No completion is scheduled, no
    /// noise aging runs, and pending completions are not superseded.
    pub fn get_activation<'a>(
        &mut self,
        chunk: impl Into<ChunkInput<'a>>,
    ) -> MemoryResult<f64> {
        let chunk = chunk.into().normalize(&Bindings::new())?;
        if chunk.placeholder_count() > 1 {
            return Err(MemoryError::MultiplePlaceholders);
        }
        match chunk.placeholder_position() {
            None => {
                let prep = self.prepare(&chunk);
                Ok(self.config.scale.activation(self.coherence_of(&chunk, &prep)))
            }
            Some(p) => {
                let inhibited = match &chunk.elements()[p].value {
                    ValueExpr::Placeholder { exclude } => exclude.clone(),
                    _ => Vec::new(),
                };
                let prep = self.prepare(&chunk);
                let query = self.context_for(&prep, p);
                let mut best: Option<f64> = None;
                for (token, acc) in &self.memory {
                    if inhibited.iter().any(|x| x == token) {
                        continue;
                    }
                    let cosine = acc.compare(&query);
                    if best.map_or(true, |c| cosine > c) {
                        best = Some(cosine);
                    }
                }
                Ok(self.config.scale.activation(best.unwrap_or(0.0)))
            }
        }
    }

    /// Fire a pending completion. Stale handles (superseded by any later
    /// `add`/`request`/`resonance`) are dropped silently.
    pub fn on_timer(&mut self, handle: RequestHandle) -> Completion {
        if handle.generation != self.generation {
            debug!(
                stale = handle.generation,
                current = self.generation,
                "stale completion dropped"
            );
            return Completion::Superseded;
        }
        self.busy = false;
        match handle.outcome {
            Outcome::Recall(retrieved) => {
                self.error = false;
                self.buffer = Some(retrieved.clone());
                Completion::Recalled(retrieved)
            }
            Outcome::Fail => {
                self.error = true;
                self.buffer = None;
                Completion::Failed
            }
        }
    }

    /// Forget everything: clears the accumulators and the recency set.
    /// Symbol vectors persist, so re-added tokens keep their basis.
    pub fn clear(&mut self) {
        self.memory.clear();
        self.finst.clear();
    }

    /// The output buffer: the most recently recalled record, if any.
    pub fn buffer(&self) -> Option<&Retrieved> {
        self.buffer.as_ref()
    }

    /// Whether a request is pending completion.
    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// Whether the last completed retrieval failed.
    pub fn is_error(&self) -> bool {
        self.error
    }

    /// Number of value-tokens with accumulators.
    pub fn len(&self) -> usize {
        self.memory.len()
    }

    /// True before anything has been referenced.
    pub fn is_empty(&self) -> bool {
        self.memory.is_empty()
    }

    /// The accumulator for a token, for instrumentation.
    pub fn accumulator(&self, token: &str) -> Option<&Hrr> {
        self.memory.get(token)
    }

    /// The store's parameters.
    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    /// Inject time-scaled Gaussian corruption into every accumulator,
    /// covering the simulated time since the last aging pass. Runs before
    /// any read or write touches the accumulators.
    fn age_by_noise(&mut self) {
        let now = self.clock.now();
        let dt = now - self.last_aged;
        self.last_aged = now;
        if self.config.noise <= 0.0 || dt <= 0.0 || self.memory.is_empty() {
            return;
        }
        let sd = self.config.noise * dt.sqrt() / (self.config.dim as f64).sqrt();
        let rng = self.symbols.rng_mut();
        for acc in self.memory.values_mut() {
            acc.perturb(sd, rng);
        }
        debug!(dt, sd, "aged accumulators");
    }

    /// Define vectors, roles and accumulators for every token in the chunk,
    /// and lay out the per-position vectors used by gram construction.
    fn prepare(&mut self, chunk: &Chunk) -> Prepared {
        let slotted = chunk.is_slotted();
        let dim = self.config.dim;
        let mut val = Vec::with_capacity(chunk.len());
        let mut ph = Vec::with_capacity(chunk.len());
        for element in chunk.elements() {
            let role = element
                .slot
                .as_deref()
                .map(|slot| self.symbols.role(slot).clone());
            let ph_vec = match &role {
                Some(p) => self.symbols.placeholder().permute(p),
                None => self.symbols.placeholder().clone(),
            };
            let val_vec = match &element.value {
                ValueExpr::Literal(token) | ValueExpr::Negated(token) => {
                    let sym = self.symbols.symbol(token).clone();
                    self.memory
                        .entry(token.clone())
                        .or_insert_with(|| Hrr::zeros(dim));
                    let permuted = match &role {
                        Some(p) => sym.permute(p),
                        None => sym,
                    };
                    if matches!(element.value, ValueExpr::Negated(_)) {
                        permuted.negate()
                    } else {
                        permuted
                    }
                }
                _ => ph_vec.clone(),
            };
            val.push(val_vec);
            ph.push(ph_vec);
        }
        Prepared { slotted, val, ph }
    }

    /// The superposed gram context for position `p`, with the placeholder
    /// standing in at `p`. Identical construction serves as stored trace
    /// (write path) and query vector (read path).
    fn context_for(&self, prep: &Prepared, p: usize) -> Hrr {
        let refs: Vec<&Hrr> = (0..prep.val.len())
            .map(|i| if i == p { &prep.ph[i] } else { &prep.val[i] })
            .collect();
        let ordered = !prep.slotted;
        let min_size = if prep.slotted { 1 } else { 2 };
        match self.config.gram_mode {
            GramMode::Windowed => windowed_context(
                &refs,
                p,
                ordered,
                self.symbols.left(),
                min_size..=self.config.max_gram_size,
            ),
            GramMode::Unconstrained => {
                unconstrained_context(&refs, p, ordered, self.symbols.left(), min_size)
            }
        }
    }

    /// Mean element-removed similarity of a complete chunk.
    fn coherence_of(&self, chunk: &Chunk, prep: &Prepared) -> f64 {
        let mut sum = 0.0;
        for (p, element) in chunk.elements().iter().enumerate() {
            let ctx = self.context_for(prep, p);
            let sim = match &element.value {
                ValueExpr::Literal(token) => self
                    .memory
                    .get(token)
                    .map_or(0.0, |acc| acc.compare(&ctx)),
                ValueExpr::Negated(token) => -self
                    .memory
                    .get(token)
                    .map_or(0.0, |acc| acc.compare(&ctx)),
                _ => 0.0,
            };
            trace!(position = p, sim, "element match");
            sum += sim;
        }
        sum / chunk.len() as f64
    }
}

impl fmt::Debug for DeclarativeMemory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeclarativeMemory")
            .field("dim", &self.config.dim)
            .field("tokens", &self.memory.len())
            .field("generation", &self.generation)
            .field("busy", &self.busy)
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}
