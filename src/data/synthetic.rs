use burn::config::Config;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use uuid::Builder;

use crate::data::record::TimeSeriesRecord;

const COUNTRIES: &[&str] = &[
    "Argentina", "Bangladesh", "Canada", "Denmark", "Ethiopia", "Fiji", "Ghana", "Hungary",
    "Indonesia", "Jamaica", "Kenya", "Laos", "Mexico", "Norway", "Oman", "Peru",
];

const WORDS: &[&str] = &[
    "policy", "framework", "national", "energy", "emissions", "target", "adaptation", "strategy",
    "reduce", "support", "transition", "investment", "sector", "plan", "climate", "resilience",
];

#[derive(Config, Debug)]
pub struct SyntheticConfig {
    pub n_series: usize,

    /// Number of time steps in every series.
    #[config(default = 10)]
    pub min_length: usize,

    #[config(default = 5)]
    pub n_temporal_features: usize,

    #[config(
        default = "vec![\"Agriculture\".to_string(), \"Energy\".to_string(), \"Transport\".to_string(), \"Health\".to_string(), \"Finance\".to_string(), \"Education\".to_string()]"
    )]
    pub policy_sectors: Vec<String>,

    /// Also fill in `doc_id`.
    #[config(default = false)]
    pub include_ids: bool,
}

/// Generates random entities with a fixed number of time steps. The same seed
/// always yields the same records.
pub fn generate_fake_data(config: &SyntheticConfig, seed: u64) -> Vec<TimeSeriesRecord> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..config.n_series)
        .map(|_| fake_record(config, &mut rng))
        .collect()
}

fn fake_record(config: &SyntheticConfig, rng: &mut StdRng) -> TimeSeriesRecord {
    let steps = config.min_length;
    let features = config.n_temporal_features;

    // Each feature is either integer valued or continuous in [0, 100).
    let integer_features: Vec<bool> = (0..features).map(|_| rng.gen_bool(0.5)).collect();
    let temporal_series = (0..steps)
        .map(|_| {
            integer_features
                .iter()
                .map(|&integer| {
                    if integer {
                        rng.gen_range(0..100) as f32
                    } else {
                        rng.gen_range(0.0..100.0)
                    }
                })
                .collect()
        })
        .collect();

    let (sector, positive_sector) = sample_sectors(&config.policy_sectors, rng);

    TimeSeriesRecord {
        temporal_series,
        summary: sentence(rng),
        sector,
        country: COUNTRIES.choose(rng).copied().unwrap_or("Nowhere").to_string(),
        columns: (0..features).map(|i| format!("temporal_{i}")).collect(),
        positive_sector: Some(positive_sector),
        doc_id: config
            .include_ids
            .then(|| Builder::from_random_bytes(rng.gen()).into_uuid().to_string()),
    }
}

/// Picks between one and `len - 1` distinct sectors (one when only one exists).
fn sample_sectors(sectors: &[String], rng: &mut StdRng) -> (String, Vec<i32>) {
    let mut one_hot = vec![0; sectors.len()];
    if sectors.is_empty() {
        return (String::new(), one_hot);
    }

    let amount = if sectors.len() > 1 {
        rng.gen_range(1..sectors.len())
    } else {
        1
    };
    let picked = rand::seq::index::sample(rng, sectors.len(), amount);

    let names: Vec<&str> = picked
        .iter()
        .map(|i| {
            one_hot[i] = 1;
            sectors[i].as_str()
        })
        .collect();

    (names.join(";"), one_hot)
}

fn sentence(rng: &mut StdRng) -> String {
    let len = rng.gen_range(4..10);
    let words: Vec<&str> = (0..len)
        .filter_map(|_| WORDS.choose(rng).copied())
        .collect();

    let mut sentence = words.join(" ");
    if let Some(first) = sentence.get_mut(0..1) {
        first.make_ascii_uppercase();
    }
    sentence.push('.');
    sentence
}
