// Summary counts over the normalized device list
use super::device::{DeviceStatus, StatusCode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Summary {
    pub total: usize,
    /// Devices whose tank reads EMPTY, i.e. in use.
    pub running: usize,
    pub errors: usize,
}

pub fn summarize(devices: &[DeviceStatus]) -> Summary {
    devices.iter().fold(
        Summary {
            total: devices.len(),
            ..Summary::default()
        },
        |mut summary, device| {
            match device.code {
                StatusCode::Empty => summary.running += 1,
                StatusCode::Error => summary.errors += 1,
                StatusCode::Full => {}
            }
            summary
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(code: StatusCode) -> DeviceStatus {
        DeviceStatus {
            code,
            empty_at: None,
            full_at: None,
        }
    }

    #[test]
    fn test_summarize_counts() {
        let devices: Vec<DeviceStatus> = ["0", "1", "1", "2"]
            .iter()
            .map(|raw| device(StatusCode::from_raw(raw)))
            .collect();

        assert_eq!(
            summarize(&devices),
            Summary {
                total: 4,
                running: 2,
                errors: 1
            }
        );
    }

    #[test]
    fn test_summarize_empty() {
        assert_eq!(summarize(&[]), Summary::default());
    }
}
