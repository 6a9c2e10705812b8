//! Randomized field values for parent and child records.
//!
//! Every function takes the caller's RNG so that worker tasks can own a
//! `Send` generator and tests can seed one.

use crate::record::{Category, ChildRecord, ParentRecord, PassengerDetails, TruckDetails};
use core::ops::RangeInclusive;
use core::time::Duration;
use rand::Rng;

/// Infotainment systems a passenger car may ship with.
pub const MULTIMEDIA_SYSTEMS: [&str; 6] = [
    "Android Auto",
    "Apple CarPlay",
    "Tesla Infotainment",
    "BMW iDrive",
    "Mercedes MBUX",
    "Audi MMI",
];

/// Brand vocabulary used when fabricating parent records.
pub const BRAND_NAMES: [&str; 10] = [
    "Toyota",
    "Honda",
    "Ford",
    "BMW",
    "Mercedes",
    "Audi",
    "Volkswagen",
    "Nissan",
    "Hyundai",
    "Kia",
];

/// Model vocabulary used when fabricating parent records.
pub const MODEL_NAMES: [&str; 8] = [
    "Model A", "Model B", "Model C", "Model X", "Model Y", "Classic", "Sport", "Premium",
];

pub const AIRBAG_COUNT: RangeInclusive<u8> = 2..=8;
pub const WHEEL_COUNT: RangeInclusive<u8> = 4..=18;
pub const BODY_VOLUME: RangeInclusive<f64> = 5.0..=50.0;
pub const HORSEPOWER: RangeInclusive<u32> = 100..=500;
pub const MAX_SPEED: RangeInclusive<u32> = 150..=300;
pub const REGISTRATION_DIGITS: RangeInclusive<u16> = 1000..=9999;

fn pick<'a, R: Rng>(rng: &mut R, values: &[&'a str]) -> &'a str {
    values[rng.random_range(0..values.len())]
}

fn letter<R: Rng>(rng: &mut R) -> char {
    char::from(b'A' + rng.random_range(0..26u8))
}

/// Returns a plate such as `AB1234CD`.
pub fn registration_code<R: Rng>(rng: &mut R) -> String {
    let mut code = String::with_capacity(8);
    code.push(letter(rng));
    code.push(letter(rng));
    code.push_str(&rng.random_range(REGISTRATION_DIGITS).to_string());
    code.push(letter(rng));
    code.push(letter(rng));
    code
}

pub fn multimedia_name<R: Rng>(rng: &mut R) -> String {
    pick(rng, &MULTIMEDIA_SYSTEMS).to_owned()
}

pub fn airbag_count<R: Rng>(rng: &mut R) -> u8 {
    rng.random_range(AIRBAG_COUNT)
}

pub fn wheel_count<R: Rng>(rng: &mut R) -> u8 {
    rng.random_range(WHEEL_COUNT)
}

/// Body volume in cubic meters, rounded to one decimal place.
///
/// Rounding happens after sampling, and both bounds are already whole tenths,
/// so the result stays inside [`BODY_VOLUME`].
pub fn body_volume<R: Rng>(rng: &mut R) -> f64 {
    (rng.random_range(BODY_VOLUME) * 10.0).round() / 10.0
}

/// Number of children a generation run produces.
pub fn child_count<R: Rng>(rng: &mut R, range: RangeInclusive<usize>) -> usize {
    rng.random_range(range)
}

/// Simulated latency for a single generated item, uniform in `[0, max]`.
pub fn item_delay<R: Rng>(rng: &mut R, max: Duration) -> Duration {
    let max_micros = u64::try_from(max.as_micros()).unwrap_or(u64::MAX);
    Duration::from_micros(rng.random_range(0..=max_micros))
}

/// Builds one child record whose variant matches `category`.
pub fn child_record<R: Rng>(rng: &mut R, category: Category) -> ChildRecord {
    let registration = registration_code(rng);
    match category {
        Category::Passenger => ChildRecord::Passenger(PassengerDetails::new(
            registration,
            multimedia_name(rng),
            airbag_count(rng),
        )),
        Category::Truck => ChildRecord::Truck(TruckDetails::new(
            registration,
            wheel_count(rng),
            body_volume(rng),
        )),
    }
}

/// Fabricates a parent record with a fresh identity.
pub fn parent_record<R: Rng>(rng: &mut R) -> ParentRecord {
    let category = if rng.random_bool(0.5) {
        Category::Passenger
    } else {
        Category::Truck
    };

    ParentRecord::new(
        pick(rng, &BRAND_NAMES),
        pick(rng, &MODEL_NAMES),
        rng.random_range(HORSEPOWER),
        rng.random_range(MAX_SPEED),
        category,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::StdRng};

    fn seeded() -> StdRng {
        StdRng::seed_from_u64(0x5eed)
    }

    #[test]
    fn registration_code_layout() {
        let mut rng = seeded();
        for _ in 0..500 {
            let code = registration_code(&mut rng);
            let bytes = code.as_bytes();
            assert_eq!(bytes.len(), 8, "{code}");
            assert!(bytes[..2].iter().all(u8::is_ascii_uppercase), "{code}");
            assert!(bytes[2..6].iter().all(u8::is_ascii_digit), "{code}");
            assert!(bytes[6..].iter().all(u8::is_ascii_uppercase), "{code}");
            let digits: u16 = code[2..6].parse().unwrap();
            assert!(REGISTRATION_DIGITS.contains(&digits));
        }
    }

    #[test]
    fn body_volume_is_bounded_and_rounded() {
        let mut rng = seeded();
        for _ in 0..2_000 {
            let volume = body_volume(&mut rng);
            assert!(BODY_VOLUME.contains(&volume), "{volume}");
            let tenths = volume * 10.0;
            assert!((tenths - tenths.round()).abs() < 1e-9, "{volume}");
        }
    }

    #[test]
    fn child_record_matches_category() {
        let mut rng = seeded();
        for _ in 0..200 {
            match child_record(&mut rng, Category::Passenger) {
                ChildRecord::Passenger(details) => {
                    assert!(AIRBAG_COUNT.contains(&details.airbag_count()));
                    assert!(MULTIMEDIA_SYSTEMS.contains(&details.multimedia_name()));
                }
                other => panic!("expected passenger, got {other:?}"),
            }
            match child_record(&mut rng, Category::Truck) {
                ChildRecord::Truck(details) => {
                    assert!(WHEEL_COUNT.contains(&details.wheel_count()));
                    assert!(BODY_VOLUME.contains(&details.body_volume()));
                }
                other => panic!("expected truck, got {other:?}"),
            }
        }
    }

    #[test]
    fn parent_record_uses_vocabulary_and_ranges() {
        let mut rng = seeded();
        let mut seen_passenger = false;
        let mut seen_truck = false;
        for _ in 0..200 {
            let record = parent_record(&mut rng);
            assert!(BRAND_NAMES.contains(&record.brand.as_str()));
            assert!(MODEL_NAMES.contains(&record.model.as_str()));
            assert!(HORSEPOWER.contains(&record.horsepower));
            assert!(MAX_SPEED.contains(&record.max_speed));
            match record.category {
                Category::Passenger => seen_passenger = true,
                Category::Truck => seen_truck = true,
            }
        }
        assert!(seen_passenger && seen_truck);
    }

    #[test]
    fn item_delay_never_exceeds_max() {
        let mut rng = seeded();
        let max = Duration::from_millis(500);
        for _ in 0..1_000 {
            assert!(item_delay(&mut rng, max) <= max);
        }
        assert_eq!(item_delay(&mut rng, Duration::ZERO), Duration::ZERO);
    }
}
