//! Pin number inference
//!
//! Proposes a pin number for an unlabeled via from the labeled vias of the
//! same component, assuming pins sit on a 0.1 inch grid. The guess is only a
//! default for the naming dialog; the operator can always override it.

use crate::features::{ConfirmedVia, FeatureStore};
use crate::geometry::Point;

/// Standard pin pitch in inches
pub const PIN_PITCH_INCHES: f64 = 0.1;

struct Labeled<'a> {
    via: &'a ConfirmedVia,
    number: i64,
    distance: f64,
}

/// Returns the guessed pin number, or an empty string when there is no
/// reasonable guess.
pub fn guess_pin(store: &FeatureStore, via: &ConfirmedVia, component_id: &str, dpi: f64) -> String {
    if dpi <= 0.0 || component_id.is_empty() {
        return String::new();
    }
    let pitch = PIN_PITCH_INCHES * dpi;

    let mut labeled: Vec<Labeled> = store
        .confirmed_vias()
        .filter(|v| v.id != via.id && v.component_id.as_deref() == Some(component_id))
        .filter_map(|v| {
            let number = v.pin_number.as_deref()?.trim().parse::<i64>().ok()?;
            Some(Labeled {
                via: v,
                number,
                distance: v.center.distance(via.center),
            })
        })
        .collect();
    labeled.sort_by(|a, b| {
        a.distance
            .partial_cmp(&b.distance)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.via.id.cmp(&b.via.id))
    });

    let Some(closest) = labeled.first() else {
        return String::new();
    };

    let steps = (closest.distance / pitch).round() as i64;
    if steps < 1 {
        return String::new();
    }

    let simple = closest.number + steps;
    let simple_guess = if simple >= 1 { simple.to_string() } else { String::new() };

    let Some(second) = labeled.get(1) else {
        return simple_guess;
    };

    let reference = second.via.center.sub(closest.via.center);
    let ref_steps = (reference.length() / pitch).round();
    if ref_steps == 0.0 {
        return simple_guess;
    }
    let pins_per_step = (second.number - closest.number) as f64 / ref_steps;
    if pins_per_step == 0.0 {
        return simple_guess;
    }

    let target: Point = via.center.sub(closest.via.center);
    let dot = target.dot(reference);
    let direction = if dot >= 0.0 {
        pins_per_step.signum()
    } else {
        -pins_per_step.signum()
    };

    let guess = closest.number + (steps as f64 * direction).round() as i64;
    tracing::debug!(
        "[PinGuess] {} near {} (steps {}, pins/step {:.2}, dot {:.1}) -> {}",
        via.id,
        closest.via.id,
        steps,
        pins_per_step,
        dot,
        guess
    );
    if guess >= 1 {
        guess.to_string()
    } else {
        simple_guess
    }
}
