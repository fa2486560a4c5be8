use std::collections::HashMap;
use std::io::BufRead;

use log::debug;
use rand::Rng;
use rand_distr::{Distribution, Gamma};

use crate::errors::StatsError;

///
/// Parameters of the gfold estimator.
///
#[derive(Debug, Clone, PartialEq)]
pub struct GfoldOptions {
    /// Added to every log2 ratio.
    pub offset: f64,
    /// Tail probability of the credible bound, in `(0, 0.5]`.
    pub tail_quantile: f64,
    /// Posterior draws per estimate.
    pub sample_count: usize,
}

impl Default for GfoldOptions {
    fn default() -> Self {
        GfoldOptions {
            offset: 0.0,
            tail_quantile: 0.01,
            sample_count: 1000,
        }
    }
}

impl GfoldOptions {
    pub fn validate(&self) -> Result<(), StatsError> {
        if !(self.tail_quantile > 0.0 && self.tail_quantile <= 0.5) {
            return Err(StatsError::InvalidProbability(self.tail_quantile));
        }
        Ok(())
    }
}

///
/// Precomputed gfold values for a square grid of counts.
///
/// Counts above `max_count` are clamped onto the grid edge before lookup.
///
#[derive(Debug, Clone, Default)]
pub struct GfoldTable {
    values: HashMap<(u64, u64), f64>,
    max_count: u64,
}

impl GfoldTable {
    ///
    /// Parse a table with one `count1<TAB>count2<TAB>value` row per line. Blank
    /// lines and `#` comments are skipped.
    ///
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self, StatsError> {
        let mut table = GfoldTable::default();
        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 3 {
                return Err(StatsError::TableParseError {
                    line: idx + 1,
                    reason: format!("expected 3 fields, found {}", fields.len()),
                });
            }
            let parse_count = |s: &str| {
                s.parse::<u64>().map_err(|e| StatsError::TableParseError {
                    line: idx + 1,
                    reason: format!("bad count '{}': {}", s, e),
                })
            };
            let c1 = parse_count(fields[0])?;
            let c2 = parse_count(fields[1])?;
            let value = fields[2]
                .parse::<f64>()
                .map_err(|e| StatsError::TableParseError {
                    line: idx + 1,
                    reason: format!("bad value '{}': {}", fields[2], e),
                })?;
            table.insert(c1, c2, value);
        }
        Ok(table)
    }

    pub fn insert(&mut self, count1: u64, count2: u64, value: f64) {
        self.max_count = self.max_count.max(count1).max(count2);
        self.values.insert((count1, count2), value);
    }

    pub fn get(&self, count1: u64, count2: u64) -> Option<f64> {
        let key = (count1.min(self.max_count), count2.min(self.max_count));
        self.values.get(&key).copied()
    }

    pub fn max_count(&self) -> u64 {
        self.max_count
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

///
/// Generalized fold change between two counts.
///
/// The estimate is a credible bound of `log2(r1 / r2)` where each rate has the
/// posterior `Gamma(count + 1, 1)`: the bound closest to zero on the side of
/// the posterior mean. It is forced to zero whenever its sign disagrees with
/// `count1 - count2`. Estimates are memoized per `(count1, count2)` for the
/// lifetime of the value.
///
#[derive(Debug, Clone, Default)]
pub struct Gfold {
    options: GfoldOptions,
    table: Option<GfoldTable>,
    cache: HashMap<(u64, u64), f64>,
}

impl Gfold {
    pub fn new(options: GfoldOptions) -> Self {
        Gfold {
            options,
            table: None,
            cache: HashMap::new(),
        }
    }

    pub fn with_table(mut self, table: GfoldTable) -> Self {
        self.table = Some(table);
        self
    }

    pub fn options(&self) -> &GfoldOptions {
        &self.options
    }

    ///
    /// gfold of `count1` against `count2`, drawing from `rng` on a cache miss
    /// that the table cannot answer.
    ///
    pub fn get<R: Rng + ?Sized>(
        &mut self,
        count1: u64,
        count2: u64,
        rng: &mut R,
    ) -> Result<f64, StatsError> {
        if let Some(value) = self.cache.get(&(count1, count2)) {
            return Ok(*value);
        }

        let raw = match self.table.as_ref().and_then(|t| t.get(count1, count2)) {
            Some(value) => value + self.options.offset,
            None => self.sample(count1, count2, rng)?,
        };
        let value = sign_constrain(raw, count1, count2);
        self.cache.insert((count1, count2), value);
        Ok(value)
    }

    fn sample<R: Rng + ?Sized>(
        &self,
        count1: u64,
        count2: u64,
        rng: &mut R,
    ) -> Result<f64, StatsError> {
        let n = self.options.sample_count.max(1);
        let shape1 = count1 as f64 + 1.0;
        let shape2 = count2 as f64 + 1.0;
        let posterior1 = Gamma::new(shape1, 1.0).map_err(|_| StatsError::InvalidShape(shape1))?;
        let posterior2 = Gamma::new(shape2, 1.0).map_err(|_| StatsError::InvalidShape(shape2))?;

        let mut draws: Vec<f64> = (0..n)
            .map(|_| {
                posterior1.sample(rng).log2() - posterior2.sample(rng).log2() + self.options.offset
            })
            .collect();
        draws.sort_by(|a, b| a.total_cmp(b));

        let mean = draws.iter().sum::<f64>() / n as f64;
        let tail = ((n as f64 * self.options.tail_quantile).floor() as usize).min(n - 1);
        let value = if mean >= 0.0 {
            draws[tail]
        } else {
            draws[n - 1 - tail]
        };
        debug!("gfold({}, {}) sampled {} draws: {:.5}", count1, count2, n, value);
        Ok(value)
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    pub fn clear(&mut self) {
        self.cache.clear();
    }
}

fn sign_constrain(value: f64, count1: u64, count2: u64) -> f64 {
    match count1.cmp(&count2) {
        std::cmp::Ordering::Greater if value > 0.0 => value,
        std::cmp::Ordering::Less if value < 0.0 => value,
        _ => 0.0,
    }
}
