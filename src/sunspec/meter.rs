//! Meter block (SunSpec model 201-204 body, 53 registers)

use super::cursor::{DecodeError, FieldKind, RawBlock};
use super::{read_group, Readings, ScaleGroup};

/// Decode the first meter's block.
pub fn decode(raw: &RawBlock) -> Result<Readings, DecodeError> {
    let mut cursor = raw.cursor();
    let mut out = Readings::new();

    read_group(
        &mut cursor,
        FieldKind::I16,
        &["m1accurrent", "m1accurrenta", "m1accurrentb", "m1accurrentc"],
        &mut out,
    )?;

    // Wire order is LN, AN, BN, CN, LL, AB, BC, CA. Both the LL and the LN
    // totals are published from the AB register, matching deployed installs.
    let _ln = cursor.read_i16()?;
    let an = cursor.read_i16()?;
    let bn = cursor.read_i16()?;
    let cn = cursor.read_i16()?;
    let _ll = cursor.read_i16()?;
    let ab = cursor.read_i16()?;
    let bc = cursor.read_i16()?;
    let ca = cursor.read_i16()?;
    let mut voltage = ScaleGroup::new();
    for (key, raw) in [
        ("m1acvoltagell", ab),
        ("m1acvoltageab", ab),
        ("m1acvoltagebc", bc),
        ("m1acvoltageca", ca),
        ("m1acvoltageln", ab),
        ("m1acvoltagean", an),
        ("m1acvoltagebn", bn),
        ("m1acvoltagecn", cn),
    ] {
        voltage.push(key, i64::from(raw));
    }
    voltage.apply(cursor.read_i16()?, &mut out);

    read_group(&mut cursor, FieldKind::I16, &["m1acfreq"], &mut out)?;
    read_group(
        &mut cursor,
        FieldKind::I16,
        &["m1acpower", "m1acpowera", "m1acpowerb", "m1acpowerc"],
        &mut out,
    )?;
    read_group(
        &mut cursor,
        FieldKind::I16,
        &["m1acva", "m1acvaa", "m1acvab", "m1acvac"],
        &mut out,
    )?;
    read_group(
        &mut cursor,
        FieldKind::I16,
        &["m1acvar", "m1acvara", "m1acvarb", "m1acvarc"],
        &mut out,
    )?;
    read_group(
        &mut cursor,
        FieldKind::I16,
        &["m1acpf", "m1acpfa", "m1acpfb", "m1acpfc"],
        &mut out,
    )?;
    read_group(
        &mut cursor,
        FieldKind::U32,
        &[
            "m1acexported",
            "m1acexporteda",
            "m1acexportedb",
            "m1acexportedc",
            "m1acimported",
            "m1acimporteda",
            "m1acimportedb",
            "m1acimportedc",
        ],
        &mut out,
    )?;

    Ok(out)
}
