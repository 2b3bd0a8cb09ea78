//! Huawei E1550 overrides.

use crate::modem::{ModemContext, ModemError};

use super::generic;
use super::profile::{DeviceProfile, Interface, Operations, Protocol};

const SUBMODES: [&str; 19] = [
    "No service",
    "GSM",
    "GPRS",
    "EDGE",
    "WCDMA",
    "HSDPA",
    "HSUPA",
    "HSDPA+HSUPA",
    "TD_SCDMA",
    "HSPA+",
    "HSPA+",
    "HSPA+",
    "HSPA+",
    "HSPA+",
    "HSPA+",
    "HSPA+",
    "HSPA+",
    "HSPA+ (64QAM)",
    "HSPA+ (MIMO)",
];

/// Huawei E1550 USB stick.
pub static E1550: DeviceProfile = DeviceProfile {
    model: "E1550",
    vendor_id: 0x12d1,
    product_id: 0x1001,
    interfaces: &[Interface {
        index: 0,
        protocol: Protocol::At,
    }],
    operations: Operations {
        network_type: Some(network_type),
        ..generic::OPERATIONS
    },
    registration_watch: true,
};

/// Names a `^SYSINFO` system submode.
///
/// Zero means no service and yields `None`; codes outside the table are
/// reported as WCDMA.
#[must_use]
pub fn submode_name(submode: u32) -> Option<&'static str> {
    if submode == 0 {
        return None;
    }
    let index = usize::try_from(submode).unwrap_or(usize::MAX);
    SUBMODES.get(index).or(SUBMODES.get(4)).copied()
}

fn network_type(context: &ModemContext) -> Result<String, ModemError> {
    let response = context.query(
        "AT^SYSINFO",
        "\r\n\\^SYSINFO:[0-9]+,[0-9]+,[0-9]+,[0-9]+,[0-9]+,[0-9]*,([0-9]+)\r\n\r\nOK\r\n",
    )?;
    let submode: u32 = generic::number(&response, 1, "AT^SYSINFO")?;
    submode_name(submode)
        .map(str::to_owned)
        .ok_or_else(|| ModemError::unexpected("AT^SYSINFO", "no service"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, None)]
    #[case(1, Some("GSM"))]
    #[case(4, Some("WCDMA"))]
    #[case(12, Some("HSPA+"))]
    #[case(17, Some("HSPA+ (64QAM)"))]
    #[case(18, Some("HSPA+ (MIMO)"))]
    #[case(19, Some("WCDMA"))]
    #[case(255, Some("WCDMA"))]
    fn submodes_are_named(#[case] submode: u32, #[case] expected: Option<&str>) {
        assert_eq!(submode_name(submode), expected);
    }
}
