//! Inverter block (SunSpec model 101-103 body, 38 registers)

use super::cursor::{DecodeError, FieldKind, RawBlock};
use super::{read_group, scale, Readings, ScaleGroup, Value};

/// Decode the inverter block. Field order is fixed by the device map.
pub fn decode(raw: &RawBlock) -> Result<Readings, DecodeError> {
    let mut cursor = raw.cursor();
    let mut out = Readings::new();

    read_group(
        &mut cursor,
        FieldKind::U16,
        &["accurrent", "accurrenta", "accurrentb", "accurrentc"],
        &mut out,
    )?;
    read_group(
        &mut cursor,
        FieldKind::U16,
        &[
            "acvoltageab",
            "acvoltagebc",
            "acvoltageca",
            "acvoltagean",
            "acvoltagebn",
            "acvoltagecn",
        ],
        &mut out,
    )?;
    read_group(&mut cursor, FieldKind::I16, &["acpower"], &mut out)?;
    read_group(&mut cursor, FieldKind::U16, &["acfreq"], &mut out)?;
    read_group(&mut cursor, FieldKind::I16, &["acva"], &mut out)?;
    read_group(&mut cursor, FieldKind::I16, &["acvar"], &mut out)?;
    read_group(&mut cursor, FieldKind::I16, &["acpf"], &mut out)?;

    // lifetime energy carries an unsigned scale factor and is reported in kWh
    let energy = cursor.read_u32()?;
    let energy_sf = cursor.read_u16()?;
    out.insert(
        "acenergy",
        Value::Measured(scale::energy_kwh(energy, energy_sf)),
    );

    read_group(&mut cursor, FieldKind::U16, &["dccurrent"], &mut out)?;
    read_group(&mut cursor, FieldKind::U16, &["dcvoltage"], &mut out)?;
    read_group(&mut cursor, FieldKind::I16, &["dcpower"], &mut out)?;

    cursor.skip(1)?;
    // heat sink temperature: its scale factor comes after two more reserved registers
    let mut temperature = ScaleGroup::new();
    temperature.read(&mut cursor, FieldKind::I16, "tempsink")?;
    cursor.skip(2)?;
    let temperature_sf = cursor.read_i16()?;
    temperature.apply(temperature_sf, &mut out);

    out.insert("status", Value::Code(cursor.read_i16()?));
    out.insert("statusvendor", Value::Code(cursor.read_i16()?));

    Ok(out)
}
