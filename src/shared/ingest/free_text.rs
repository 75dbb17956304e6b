//! Parser for the human-readable dump some devices send instead of JSON:
//!
//! `adc reading: 20, co2: (ppm) 12, temp: 28.28, humidity: 54.25`
//!
//! Clauses are split on commas and matched case-insensitively. Unknown
//! clauses are skipped. The format carries no PM2.5 value, so one is drawn
//! from [`synthetic_pm25`] when the dump does not provide it.
//!
//! A recognized clause whose value is not a number (`temp: 28.2.8`) makes the
//! whole dump untrustworthy: every field is reported as 0.

use rand::Rng;
use regex::Regex;
use serde_json::{Map, Value};

/// Loose numeric token; validity is decided by `f64` parsing, so a token
/// like `28.2.8` is captured and rejected rather than silently truncated.
const NUMBER: &str = r"([-+0-9.]+)";

/// Field names produced by the parser, in the key space of the normalizer.
pub const ADC: &str = "adc";
pub const CO2: &str = "co2";
pub const TEMPERATURE: &str = "temperature";
pub const HUMIDITY: &str = "humidity";
pub const PM25: &str = "pm25";
pub const VOC: &str = "voc";

struct ClausePattern {
    marker: &'static str,
    field: &'static str,
    regex: Regex,
}

pub struct FreeTextParser {
    patterns: Vec<ClausePattern>,
}

impl FreeTextParser {
    pub fn new() -> Result<Self, regex::Error> {
        let clauses: [(&'static str, &'static str, String); 6] = [
            ("adc reading:", ADC, format!(r"adc reading:[^0-9+\-.]*{}", NUMBER)),
            ("co2:", CO2, format!(r"co2:[^(]*\(ppm\)[^0-9+\-.]*{}", NUMBER)),
            ("temp:", TEMPERATURE, format!(r"temp:[^0-9+\-.]*{}", NUMBER)),
            ("humidity:", HUMIDITY, format!(r"humidity:[^0-9+\-.]*{}", NUMBER)),
            ("pm2", PM25, format!(r"pm2\.?5:[^0-9+\-.]*{}", NUMBER)),
            ("voc:", VOC, format!(r"voc:[^0-9+\-.]*{}", NUMBER)),
        ];

        let mut patterns = Vec::with_capacity(clauses.len());
        for (marker, field, pattern) in clauses {
            patterns.push(ClausePattern {
                marker,
                field,
                regex: Regex::new(&pattern)?,
            });
        }

        Ok(FreeTextParser { patterns })
    }

    /// Extracts recognized fields. `voc` is always present (0 when absent)
    /// and `pm25` is synthesized from `rng` when the dump lacks it.
    pub fn parse<R: Rng + ?Sized>(&self, text: &str, rng: &mut R) -> Map<String, Value> {
        let mut fields = match self.extract(text) {
            Ok(fields) => fields,
            Err(token) => {
                log::warn!(
                    "Malformed numeric token '{}' in free-text payload, defaulting fields to 0",
                    token
                );
                return zeroed();
            }
        };

        if !fields.contains_key(VOC) {
            fields.insert(VOC.to_string(), Value::from(0.0));
        }
        if !fields.contains_key(PM25) {
            fields.insert(PM25.to_string(), Value::from(synthetic_pm25(rng)));
        }

        fields
    }

    fn extract(&self, text: &str) -> Result<Map<String, Value>, String> {
        let mut fields = Map::new();

        for clause in text.split(',') {
            let clause = clause.trim().to_lowercase();

            for pattern in &self.patterns {
                if !clause.contains(pattern.marker) || fields.contains_key(pattern.field) {
                    continue;
                }
                if let Some(caps) = pattern.regex.captures(&clause) {
                    let token = &caps[1];
                    let value = token.parse::<f64>().map_err(|_| token.to_string())?;
                    fields.insert(pattern.field.to_string(), Value::from(value));
                }
            }
        }

        Ok(fields)
    }
}

fn zeroed() -> Map<String, Value> {
    [ADC, CO2, TEMPERATURE, HUMIDITY, VOC, PM25]
        .into_iter()
        .map(|field| (field.to_string(), Value::from(0.0)))
        .collect()
}

/// Stand-in PM2.5 value for devices without a particulate sensor.
/// 80% in [0, 30], 15% in [30, 60], 5% in [60, 120], one decimal.
pub fn synthetic_pm25<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    let tier: f64 = rng.gen();
    let value = if tier < 0.80 {
        rng.gen_range(0.0..=30.0)
    } else if tier < 0.95 {
        rng.gen_range(30.0..=60.0)
    } else {
        rng.gen_range(60.0..=120.0)
    };

    (value * 10.0_f64).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn parse(text: &str) -> Map<String, Value> {
        let parser = FreeTextParser::new().unwrap();
        let mut rng = StdRng::seed_from_u64(42);
        parser.parse(text, &mut rng)
    }

    #[test]
    fn parses_device_dump() {
        let fields = parse("adc reading: 20, co2: (ppm) 12, temp: 28.28, humidity: 54.25");

        assert_eq!(fields[ADC], 20.0);
        assert_eq!(fields[CO2], 12.0);
        assert_eq!(fields[TEMPERATURE], 28.28);
        assert_eq!(fields[HUMIDITY], 54.25);
        assert_eq!(fields[VOC], 0.0);

        let pm25 = fields[PM25].as_f64().unwrap();
        assert!((0.0..=120.0).contains(&pm25));
    }

    #[test]
    fn matching_is_case_insensitive() {
        let fields = parse("ADC Reading: 7, CO2: (PPM) 640, Temp: 21.5, Humidity: 40");

        assert_eq!(fields[ADC], 7.0);
        assert_eq!(fields[CO2], 640.0);
        assert_eq!(fields[TEMPERATURE], 21.5);
        assert_eq!(fields[HUMIDITY], 40.0);
    }

    #[test]
    fn unrecognized_clauses_are_ignored() {
        let fields = parse("uptime: 3600, temp: 22, wifi: ok");

        assert_eq!(fields[TEMPERATURE], 22.0);
        assert!(!fields.contains_key("uptime"));
        assert!(!fields.contains_key(CO2));
        assert_eq!(fields[VOC], 0.0);
    }

    #[test]
    fn co2_without_ppm_marker_is_not_recognized() {
        let fields = parse("co2: 450");

        assert!(!fields.contains_key(CO2));
    }

    #[test]
    fn explicit_pm25_and_voc_are_kept() {
        let fields = parse("pm2.5: 17.5, voc: 1.25, temp: 23");

        assert_eq!(fields[PM25], 17.5);
        assert_eq!(fields[VOC], 1.25);
    }

    #[test]
    fn malformed_number_zeroes_every_field() {
        let fields = parse("adc reading: 20, co2: (ppm) 450, temp: 28.2.8, humidity: 54.25");

        for field in [ADC, CO2, TEMPERATURE, HUMIDITY, VOC, PM25] {
            assert_eq!(fields[field], 0.0, "field {}", field);
        }
    }

    #[test]
    fn sign_without_digits_is_malformed() {
        let fields = parse("humidity: -, temp: 21");

        assert_eq!(fields[HUMIDITY], 0.0);
        assert_eq!(fields[TEMPERATURE], 0.0);
        assert_eq!(fields[PM25], 0.0);
    }

    #[test]
    fn synthetic_pm25_is_repeatable_for_a_fixed_seed() {
        let parser = FreeTextParser::new().unwrap();
        let text = "temp: 22";

        let first = parser.parse(text, &mut StdRng::seed_from_u64(9));
        let second = parser.parse(text, &mut StdRng::seed_from_u64(9));

        assert_eq!(first[PM25], second[PM25]);
    }

    #[test]
    fn synthetic_pm25_stays_within_tiers() {
        let mut rng = StdRng::seed_from_u64(1);
        let draws: Vec<f64> = (0..2000).map(|_| synthetic_pm25(&mut rng)).collect();

        assert!(draws.iter().all(|v| (0.0..=120.0).contains(v)));

        let low = draws.iter().filter(|v| **v <= 30.0).count();
        assert!(low > 1400, "expected most draws in the low tier, got {}", low);
        assert!(draws.iter().any(|v| *v > 60.0));
    }
}
