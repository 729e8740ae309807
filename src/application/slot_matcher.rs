// Re-binding of stable display slots to freshly enumerated device columns
use crate::domain::sensor::{DataColumn, SensorBinding};
use crate::domain::slot::{SensorSlot, SLOT_COUNT};

/// One step of the matching cascade. Stages run in order; each only fills
/// slots left unmatched by earlier stages and consumes the column it takes.
struct MatchStage {
    name: &'static str,
    matches: fn(&DataColumn, &SensorBinding) -> bool,
}

fn same_column_id(column: &DataColumn, prior: &SensorBinding) -> bool {
    prior.column_id.as_deref() == Some(column.id.as_str())
}

fn same_unit(column: &DataColumn, prior: &SensorBinding) -> bool {
    prior.unit.as_deref() == Some(column.unit.as_str())
}

fn same_position(column: &DataColumn, prior: &SensorBinding) -> bool {
    prior.position == Some(column.position)
}

fn same_position_and_unit(column: &DataColumn, prior: &SensorBinding) -> bool {
    same_position(column, prior) && same_unit(column, prior)
}

fn any_column(_: &DataColumn, _: &SensorBinding) -> bool {
    true
}

const MATCH_STAGES: [MatchStage; 5] = [
    MatchStage { name: "column id", matches: same_column_id },
    MatchStage { name: "position and unit", matches: same_position_and_unit },
    MatchStage { name: "unit", matches: same_unit },
    MatchStage { name: "position", matches: same_position },
    MatchStage { name: "any", matches: any_column },
];

/// Re-bind `slots` to `columns`. With no columns every slot is cleared;
/// otherwise slots are filled through the cascade and a lone match always
/// lands in slot 0. Never fails.
pub fn match_sensors_to_columns(slots: &mut [SensorSlot; SLOT_COUNT], columns: Option<&[DataColumn]>) {
    let columns = match columns {
        Some(columns) if !columns.is_empty() => columns,
        _ => {
            for slot in slots.iter_mut() {
                slot.set_binding(SensorBinding::default());
            }
            return;
        }
    };

    let priors: [SensorBinding; SLOT_COUNT] = [slots[0].binding.clone(), slots[1].binding.clone()];
    let mut remaining: Vec<&DataColumn> = columns.iter().collect();
    // (index of the prior binding, matched column)
    let mut matched: [Option<(usize, &DataColumn)>; SLOT_COUNT] = [None; SLOT_COUNT];

    for stage in &MATCH_STAGES {
        for (i, prior) in priors.iter().enumerate() {
            if matched[i].is_some() {
                continue;
            }
            if let Some(pos) = remaining.iter().position(|c| (stage.matches)(c, prior)) {
                let column = remaining.remove(pos);
                tracing::debug!("Slot {} matched column {} by {}", i, column.id, stage.name);
                matched[i] = Some((i, column));
            }
        }
    }

    // A lone survivor in slot 1 moves to slot 0 together with its samples.
    if matched[0].is_none() && matched[1].is_some() {
        matched.swap(0, 1);
        slots.swap(0, 1);
        for (index, slot) in slots.iter_mut().enumerate() {
            slot.index = index;
        }
    }

    for (slot, matched) in slots.iter_mut().zip(matched) {
        let binding = match matched {
            Some((prior, column)) => SensorBinding::from_column(column, &priors[prior]),
            None => SensorBinding::default(),
        };
        slot.set_binding(binding);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::telemetry::Sample;

    fn column(id: &str, unit: &str, position: i32) -> DataColumn {
        DataColumn::new(id, position, unit)
    }

    fn slots_with(priors: [Option<(&str, &str, Option<i32>)>; SLOT_COUNT]) -> [SensorSlot; SLOT_COUNT] {
        let mut slots = SensorSlot::initial();
        for (slot, prior) in slots.iter_mut().zip(priors) {
            if let Some((id, unit, position)) = prior {
                slot.binding.column_id = Some(id.to_string());
                slot.binding.unit = Some(unit.to_string());
                slot.binding.position = position;
            }
        }
        slots
    }

    fn bound_ids(slots: &[SensorSlot; SLOT_COUNT]) -> [Option<&str>; SLOT_COUNT] {
        [slots[0].binding.column_id.as_deref(), slots[1].binding.column_id.as_deref()]
    }

    #[test]
    fn test_identity_wins_over_unit() {
        let mut slots = slots_with([Some(("901", "lux", None)), None]);
        let columns = [column("900", "lux", 0), column("901", "lux", 1), column("902", "N", 2)];

        match_sensors_to_columns(&mut slots, Some(&columns));

        assert_eq!(bound_ids(&slots), [Some("901"), Some("900")]);
    }

    #[test]
    fn test_position_and_unit_tie_break() {
        let mut slots = slots_with([Some(("1", "lux", Some(1))), None]);
        let columns = [column("900", "lux", 0), column("901", "lux", 1), column("902", "N", 2)];

        match_sensors_to_columns(&mut slots, Some(&columns));

        assert_eq!(slots[0].binding.column_id.as_deref(), Some("901"));
        assert_eq!(slots[0].binding.position, Some(1));
    }

    #[test]
    fn test_unit_before_position() {
        // Slot 0 was force at position 0; the device now has light at 0 and force at 2.
        let mut slots = slots_with([Some(("1", "N", Some(0))), Some(("2", "lux", Some(5)))]);
        let columns = [column("a", "lux", 0), column("b", "N", 2)];

        match_sensors_to_columns(&mut slots, Some(&columns));

        assert_eq!(bound_ids(&slots), [Some("b"), Some("a")]);
    }

    #[test]
    fn test_position_before_any() {
        let mut slots = slots_with([Some(("1", "degC", Some(1))), None]);
        let columns = [column("a", "lux", 0), column("b", "N", 1)];

        match_sensors_to_columns(&mut slots, Some(&columns));

        assert_eq!(bound_ids(&slots), [Some("b"), Some("a")]);
    }

    #[test]
    fn test_null_columns_clear_both_slots() {
        let mut slots = slots_with([Some(("1", "N", Some(0))), Some(("2", "lux", Some(1)))]);
        slots[0].binding.tare_value = 3.0;

        match_sensors_to_columns(&mut slots, None);
        assert!(slots.iter().all(|s| !s.binding.is_connected()));
        assert!(slots.iter().all(|s| s.binding.tare_value == 0.0));

        let mut slots = slots_with([Some(("1", "N", Some(0))), None]);
        match_sensors_to_columns(&mut slots, Some(&[]));
        assert!(slots.iter().all(|s| !s.binding.is_connected()));
    }

    #[test]
    fn test_lone_match_moves_to_primary_slot() {
        let mut slots = slots_with([Some(("1", "N", Some(0))), Some(("2", "lux", Some(1)))]);
        slots[1].binding.tare_value = 0.25;
        let columns = [column("2", "lux", 1)];

        match_sensors_to_columns(&mut slots, Some(&columns));

        assert_eq!(bound_ids(&slots), [Some("2"), None]);
        // The binding carries the tare of the slot it came from.
        assert_eq!(slots[0].binding.tare_value, 0.25);
    }

    #[test]
    fn test_lone_match_takes_its_samples_along() {
        let mut slots = slots_with([Some(("A", "N", Some(0))), Some(("B", "N", Some(1)))]);
        slots[0].append_data(&[Sample::new(0.0, 100.0)], 20.0);
        slots[1].append_data(&[Sample::new(0.0, 7.0)], 20.0);

        match_sensors_to_columns(&mut slots, Some(&[column("B", "N", 1)]));
        slots[0].append_data(&[Sample::new(1.0, 8.0)], 20.0);

        assert_eq!(bound_ids(&slots), [Some("B"), None]);
        assert_eq!(slots[0].index, 0);
        assert_eq!(slots[1].index, 1);
        assert_eq!(slots[0].recorded_samples, vec![Sample::new(0.0, 7.0), Sample::new(1.0, 8.0)]);
        assert_eq!(slots[0].value_range(), Some((7.0, 8.0)));
        // The unplugged sensor's run stays visible in slot 1.
        assert_eq!(slots[1].recorded_samples, vec![Sample::new(0.0, 100.0)]);
    }

    #[test]
    fn test_column_never_bound_twice() {
        let mut slots = slots_with([Some(("1", "N", Some(0))), Some(("1", "N", Some(0)))]);
        let columns = [column("1", "N", 0)];

        match_sensors_to_columns(&mut slots, Some(&columns));

        assert_eq!(bound_ids(&slots), [Some("1"), None]);
    }

    #[test]
    fn test_unknown_unit_is_still_matchable() {
        let mut slots = SensorSlot::initial();
        let columns = [column("x", "furlongs", 0)];

        match_sensors_to_columns(&mut slots, Some(&columns));

        assert!(slots[0].binding.is_connected());
        assert_eq!(slots[0].binding.definition.measurement_name, "Sensor Reading");
    }
}
