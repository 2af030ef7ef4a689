/// CPU usage in percent above which a reading alerts
pub const CPU_ALERT_THRESHOLD: f64 = 90.0;

/// Temperature in °C above which a reading alerts
pub const TEMPERATURE_ALERT_THRESHOLD: f64 = 80.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AlertCondition {
    CpuHigh(f64),
    TemperatureHigh(f64),
}

impl AlertCondition {
    /// All conditions a sample violates, CPU first.
    ///
    /// Both thresholds are strict: a value exactly at the limit does not alert.
    pub fn evaluate(cpu: f64, temperature: f64) -> Vec<AlertCondition> {
        let mut conditions = Vec::with_capacity(2);

        if cpu > CPU_ALERT_THRESHOLD {
            conditions.push(AlertCondition::CpuHigh(cpu));
        }

        if temperature > TEMPERATURE_ALERT_THRESHOLD {
            conditions.push(AlertCondition::TemperatureHigh(temperature));
        }

        conditions
    }

    pub fn describe(&self) -> String {
        match self {
            AlertCondition::CpuHigh(cpu) => format!("CPU high: {cpu:.1}%"),
            AlertCondition::TemperatureHigh(temp) => format!("Temperature high: {temp:.1}°C"),
        }
    }
}

/// Alert message for a sample, or `None` if nothing exceeds its threshold.
pub fn alert_message(cpu: f64, temperature: f64) -> Option<String> {
    let conditions = AlertCondition::evaluate(cpu, temperature);
    if conditions.is_empty() {
        return None;
    }

    Some(
        conditions
            .iter()
            .map(AlertCondition::describe)
            .collect::<Vec<_>>()
            .join("; "),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nothing_exceeded() {
        assert_eq!(alert_message(50.0, 60.0), None);
    }

    #[test]
    fn test_cpu_only() {
        assert_eq!(alert_message(95.0, 70.0).as_deref(), Some("CPU high: 95.0%"));
    }

    #[test]
    fn test_temperature_only() {
        assert_eq!(
            alert_message(85.0, 82.5).as_deref(),
            Some("Temperature high: 82.5°C")
        );
    }

    #[test]
    fn test_both_exceeded_cpu_first() {
        assert_eq!(
            alert_message(91.0, 81.0).as_deref(),
            Some("CPU high: 91.0%; Temperature high: 81.0°C")
        );
    }

    #[test]
    fn test_thresholds_are_strict() {
        assert_eq!(alert_message(90.0, 80.0), None);
        assert_eq!(
            AlertCondition::evaluate(90.01, 80.0),
            vec![AlertCondition::CpuHigh(90.01)]
        );
    }
}
