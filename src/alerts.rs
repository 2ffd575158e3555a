use crate::config::Thresholds;
use crate::snapshot::MetricsSnapshot;
use std::fmt;

const BYTES_PER_MEGABYTE: u64 = 1 << 20;
const BYTES_PER_MEGABIT: u64 = 1_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    CpuLoad,
    Memory,
    Disk,
    Network,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conversion {
    DirectUsage,
    PercentageUsage,
    FreeDiskSpace,
    FreeNetworkBandwidth,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportUnit {
    None,
    Percentage,
    Megabytes,
    MegabitsPerSecond,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Converted {
    pub usage_percent: u64,
    pub free: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceCheck {
    pub kind: ResourceKind,
    pub capacity: u64,
    pub usage: u64,
    pub threshold: u64,
    pub conversion: Conversion,
    pub unit: ReportUnit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Alert {
    pub kind: ResourceKind,
    pub value: u64,
}

impl Conversion {
    pub fn apply(self, capacity: u64, usage: u64) -> Converted {
        if capacity == 0 {
            return Converted::default();
        }
        match self {
            Conversion::DirectUsage => Converted {
                usage_percent: capacity,
                free: 0,
            },
            Conversion::PercentageUsage => Converted {
                usage_percent: usage_percent(capacity, usage),
                free: 0,
            },
            Conversion::FreeDiskSpace => Converted {
                usage_percent: usage_percent(capacity, usage),
                free: capacity.saturating_sub(usage) / BYTES_PER_MEGABYTE,
            },
            Conversion::FreeNetworkBandwidth => Converted {
                usage_percent: usage_percent(capacity, usage),
                free: capacity.saturating_sub(usage) / BYTES_PER_MEGABIT,
            },
        }
    }
}

fn usage_percent(capacity: u64, usage: u64) -> u64 {
    let pct = u128::from(usage) * 100 / u128::from(capacity);
    u64::try_from(pct).unwrap_or(u64::MAX)
}

impl ResourceCheck {
    pub fn from_snapshot(snapshot: &MetricsSnapshot, thresholds: &Thresholds) -> [Self; 4] {
        [
            Self {
                kind: ResourceKind::CpuLoad,
                capacity: snapshot.cpu_load,
                usage: snapshot.cpu_load,
                threshold: thresholds.cpu_load,
                conversion: Conversion::DirectUsage,
                unit: ReportUnit::None,
            },
            Self {
                kind: ResourceKind::Memory,
                capacity: snapshot.memory_capacity,
                usage: snapshot.memory_usage,
                threshold: thresholds.memory_usage_percent,
                conversion: Conversion::PercentageUsage,
                unit: ReportUnit::Percentage,
            },
            Self {
                kind: ResourceKind::Disk,
                capacity: snapshot.disk_capacity,
                usage: snapshot.disk_usage,
                threshold: thresholds.disk_usage_percent,
                conversion: Conversion::FreeDiskSpace,
                unit: ReportUnit::Megabytes,
            },
            Self {
                kind: ResourceKind::Network,
                capacity: snapshot.network_capacity,
                usage: snapshot.network_activity,
                threshold: thresholds.network_usage_percent,
                conversion: Conversion::FreeNetworkBandwidth,
                unit: ReportUnit::MegabitsPerSecond,
            },
        ]
    }

    pub fn evaluate(&self) -> Option<Alert> {
        let converted = self.conversion.apply(self.capacity, self.usage);
        if converted.usage_percent <= self.threshold {
            return None;
        }
        let value = match self.unit {
            ReportUnit::None | ReportUnit::Percentage => converted.usage_percent,
            ReportUnit::Megabytes | ReportUnit::MegabitsPerSecond => converted.free,
        };
        Some(Alert {
            kind: self.kind,
            value,
        })
    }
}

pub fn evaluate(snapshot: &MetricsSnapshot, thresholds: &Thresholds) -> Vec<Alert> {
    ResourceCheck::from_snapshot(snapshot, thresholds)
        .iter()
        .filter_map(ResourceCheck::evaluate)
        .collect()
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ResourceKind::CpuLoad => write!(f, "Load Average is too high: {}", self.value),
            ResourceKind::Memory => write!(f, "Memory usage too high: {}%", self.value),
            ResourceKind::Disk => write!(f, "Free disk space is too low: {} Mb left", self.value),
            ResourceKind::Network => write!(
                f,
                "Network bandwidth usage high: {} Mbit/s available",
                self.value
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::parse;

    const ALL_CONVERSIONS: [Conversion; 4] = [
        Conversion::DirectUsage,
        Conversion::PercentageUsage,
        Conversion::FreeDiskSpace,
        Conversion::FreeNetworkBandwidth,
    ];

    fn lines(payload: &str) -> Vec<String> {
        let snapshot = parse(payload).unwrap();
        evaluate(&snapshot, &Thresholds::default())
            .iter()
            .map(ToString::to_string)
            .collect()
    }

    #[test]
    fn healthy_server_produces_no_alerts() {
        assert!(lines("25,16000,8000,500000,100000,100000,50000").is_empty());
    }

    #[test]
    fn overloaded_server_alerts_on_every_resource() {
        assert_eq!(
            lines("95,1000,999,1000,999,1000,999"),
            vec![
                "Load Average is too high: 95",
                "Memory usage too high: 99%",
                "Free disk space is too low: 0 Mb left",
                "Network bandwidth usage high: 0 Mbit/s available",
            ]
        );
    }

    #[test]
    fn free_quantities_are_scaled() {
        // 10 GiB disk with 512 MiB free, 1 Gbit link with 50 Mbit free.
        let mib = 1_u64 << 20;
        let payload = format!(
            "0,0,0,{},{},{},{}",
            10240 * mib,
            9728 * mib,
            1_000_000_000,
            950_000_000
        );
        assert_eq!(
            lines(&payload),
            vec![
                "Free disk space is too low: 512 Mb left",
                "Network bandwidth usage high: 50 Mbit/s available",
            ]
        );
    }

    #[test]
    fn zero_capacity_never_alerts() {
        for conversion in ALL_CONVERSIONS {
            for usage in [0, 1, 500, u64::MAX] {
                assert_eq!(conversion.apply(0, usage), Converted::default());
                let check = ResourceCheck {
                    kind: ResourceKind::Memory,
                    capacity: 0,
                    usage,
                    threshold: 0,
                    conversion,
                    unit: ReportUnit::Percentage,
                };
                assert_eq!(check.evaluate(), None);
            }
        }
        assert!(lines("0,0,5,0,5,0,5").is_empty());
    }

    #[test]
    fn threshold_is_exclusive() {
        let thresholds = Thresholds::default();
        let at = MetricsSnapshot {
            cpu_load: 30,
            memory_capacity: 100,
            memory_usage: 80,
            disk_capacity: 100,
            disk_usage: 90,
            network_capacity: 100,
            network_activity: 90,
        };
        assert!(evaluate(&at, &thresholds).is_empty());

        let above = MetricsSnapshot {
            cpu_load: 31,
            memory_usage: 81,
            disk_usage: 91,
            network_activity: 91,
            ..at
        };
        let kinds: Vec<ResourceKind> = evaluate(&above, &thresholds)
            .iter()
            .map(|a| a.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![
                ResourceKind::CpuLoad,
                ResourceKind::Memory,
                ResourceKind::Disk,
                ResourceKind::Network
            ]
        );
    }

    #[test]
    fn percent_truncates() {
        assert_eq!(Conversion::PercentageUsage.apply(3, 2).usage_percent, 66);
        assert_eq!(Conversion::FreeDiskSpace.apply(1000, 999).usage_percent, 99);
    }

    #[test]
    fn usage_above_capacity_does_not_underflow() {
        let converted = Conversion::FreeNetworkBandwidth.apply(1_000_000, 3_000_000);
        assert_eq!(converted, Converted { usage_percent: 300, free: 0 });

        let huge = Conversion::PercentageUsage.apply(1, u64::MAX);
        assert_eq!(huge.usage_percent, u64::MAX);
    }

    #[test]
    fn each_resource_is_checked_once() {
        let snapshot = parse("95,1000,999,1000,999,1000,999").unwrap();
        let checks = ResourceCheck::from_snapshot(&snapshot, &Thresholds::default());
        let alerts = evaluate(&snapshot, &Thresholds::default());
        assert_eq!(checks.len(), 4);
        assert_eq!(alerts.len(), 4);
    }

    #[test]
    fn custom_thresholds_apply() {
        let snapshot = parse("25,16000,8000,500000,100000,100000,50000").unwrap();
        let thresholds = Thresholds {
            cpu_load: 20,
            memory_usage_percent: 49,
            ..Thresholds::default()
        };
        let alerts = evaluate(&snapshot, &thresholds);
        assert_eq!(
            alerts,
            vec![
                Alert {
                    kind: ResourceKind::CpuLoad,
                    value: 25
                },
                Alert {
                    kind: ResourceKind::Memory,
                    value: 50
                },
            ]
        );
    }
}
