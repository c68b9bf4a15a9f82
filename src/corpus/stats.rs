use std::collections::HashMap;

/// Aggregated external user ratings for one movie
#[derive(Debug, Clone, PartialEq)]
pub struct RatingStats {
    pub mean: f64,
    pub median: f64,
    pub count: u64,
    /// Sample standard deviation; undefined for a single rating
    pub std: Option<f64>,
}

impl RatingStats {
    fn from_ratings(mut ratings: Vec<f64>) -> Option<Self> {
        if ratings.is_empty() {
            return None;
        }
        ratings.sort_by(f64::total_cmp);

        let n = ratings.len();
        let mean = ratings.iter().sum::<f64>() / n as f64;
        let median = if n % 2 == 1 {
            ratings[n / 2]
        } else {
            (ratings[n / 2 - 1] + ratings[n / 2]) / 2.0
        };
        let std = (n > 1).then(|| {
            let sum_sq: f64 = ratings.iter().map(|r| (r - mean).powi(2)).sum();
            (sum_sq / (n - 1) as f64).sqrt()
        });

        Some(Self {
            mean,
            median,
            count: n as u64,
            std,
        })
    }
}

/// Groups `(movie_id, rating)` pairs into per-movie statistics
pub fn aggregate_ratings<I>(ratings: I) -> HashMap<i64, RatingStats>
where
    I: IntoIterator<Item = (i64, f64)>,
{
    let mut grouped: HashMap<i64, Vec<f64>> = HashMap::new();
    for (movie_id, rating) in ratings {
        if rating.is_finite() {
            grouped.entry(movie_id).or_default().push(rating);
        }
    }

    grouped
        .into_iter()
        .filter_map(|(id, values)| RatingStats::from_ratings(values).map(|stats| (id, stats)))
        .collect()
}

/// Corpus-wide constants of the weighted rating formula
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatingPrior {
    /// Mean vote average across the corpus
    pub mean_vote: f64,
    /// Vote count needed before a movie's own average dominates
    pub min_votes: f64,
}

const MIN_VOTES_QUANTILE: f64 = 0.8;

impl RatingPrior {
    /// Derives the prior from every row's vote average and vote count
    pub fn from_votes(vote_averages: &[f64], vote_counts: &[f64]) -> Self {
        Self {
            mean_vote: mean(vote_averages).unwrap_or(0.0),
            min_votes: quantile(vote_counts, MIN_VOTES_QUANTILE).unwrap_or(0.0),
        }
    }

    pub fn weighted_rating(&self, vote_count: f64, vote_average: f64) -> f64 {
        weighted_rating(vote_count, vote_average, self.mean_vote, self.min_votes)
    }
}

/// IMDb-style Bayesian average of a movie's rating toward the corpus mean
pub fn weighted_rating(v: f64, r: f64, c: f64, m: f64) -> f64 {
    if v + m > 0.0 {
        (v / (v + m)) * r + (m / (v + m)) * c
    } else {
        r
    }
}

pub fn mean(values: &[f64]) -> Option<f64> {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        return None;
    }
    Some(finite.iter().sum::<f64>() / finite.len() as f64)
}

/// Quantile with linear interpolation between the closest ranks
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(f64::total_cmp);

    let position = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}
