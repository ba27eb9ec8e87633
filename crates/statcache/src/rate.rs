//! Derived "rate" series: point-wise retention of one series against another.

use common::{Dataset, Error, Timeframe};
use tracing::{debug, warn};

use crate::cache::StatCache;

/// Bounded retention ratio of `b` against `a`.
///
/// Non-positive inputs and results outside `[0, 1]` all map to 0; an
/// implausible rate is neutralized rather than clamped to the nearest bound.
pub fn safe_rate(a: f64, b: f64) -> f64 {
    if a <= 0.0 || b <= 0.0 {
        return 0.0;
    }
    let v = 1.0 - ((a - b) / a);
    if !(0.0..=1.0).contains(&v) {
        return 0.0;
    }
    v
}

impl StatCache {
    /// Fetch both series concurrently and combine them positionally into a
    /// rate series.
    ///
    /// The result reuses series A's name and timeframe but its points are a
    /// copy, so the cached dataset keeps its raw values; the combined series
    /// is never written back to the cache. When A is longer than B, the
    /// unmatched tail is forced to 0.
    pub async fn get_rate(
        &self,
        stat_a: &str,
        stat_b: &str,
        tf: &Timeframe,
    ) -> Result<Dataset, Error> {
        let (res_a, res_b) = tokio::join!(self.get(stat_a, tf), self.get(stat_b, tf));

        // When both fetches fail, the first operand's error wins.
        let data_a = res_a?;
        let data_b = res_b?;

        debug!(
            "combining {} ({} points) with {} ({} points)",
            stat_a,
            data_a.points.len(),
            stat_b,
            data_b.points.len()
        );

        let mut points = data_a.points.clone();
        let aligned = points.len().min(data_b.points.len());

        for (pa, pb) in points.iter_mut().zip(&data_b.points) {
            if pa.time != pb.time {
                warn!(
                    "timestamp mismatch: a={} b={} dt={}",
                    pa.time,
                    pb.time,
                    pa.time - pb.time
                );
            }
            pa.value = safe_rate(pa.value, pb.value);
        }

        let cutoff = points.len() - aligned;
        if cutoff > 0 {
            warn!(
                "{} trailing points of {} have no {} counterpart, forcing to 0",
                cutoff, stat_a, stat_b
            );
            for p in &mut points[aligned..] {
                p.value = 0.0;
            }
        }

        Ok(Dataset {
            name: data_a.name.clone(),
            timeframe: data_a.timeframe.clone(),
            points,
        })
    }
}
