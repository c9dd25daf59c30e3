//! Register frames for tests, laid out exactly as the device sends them

use super::cursor::RawBlock;
use super::schema::Block;

fn push_u32(words: &mut Vec<u16>, value: u32) {
    words.push((value >> 16) as u16);
    words.push(value as u16);
}

/// Raw inverter registers. Signed fields are stored as their u16 bit pattern.
#[derive(Debug, Clone)]
pub struct InverterFrame {
    pub current: [u16; 4],
    pub current_sf: u16,
    pub voltage: [u16; 6],
    pub voltage_sf: u16,
    pub power: u16,
    pub power_sf: u16,
    pub freq: u16,
    pub freq_sf: u16,
    pub va: u16,
    pub va_sf: u16,
    pub var: u16,
    pub var_sf: u16,
    pub pf: u16,
    pub pf_sf: u16,
    pub energy: u32,
    pub energy_sf: u16,
    pub dc_current: u16,
    pub dc_current_sf: u16,
    pub dc_voltage: u16,
    pub dc_voltage_sf: u16,
    pub dc_power: u16,
    pub dc_power_sf: u16,
    pub reserved: [u16; 3],
    pub temp_sink: u16,
    pub temp_sf: u16,
    pub status: u16,
    pub status_vendor: u16,
}

impl Default for InverterFrame {
    fn default() -> Self {
        Self {
            current: [1234, 411, 412, 411],
            current_sf: -2i16 as u16,
            voltage: [4005, 4010, 3998, 2312, 2315, 2309],
            voltage_sf: -1i16 as u16,
            power: 2850,
            power_sf: 0,
            freq: 5001,
            freq_sf: -2i16 as u16,
            va: 290,
            va_sf: 1,
            var: -12i16 as u16,
            var_sf: 1,
            pf: 985,
            pf_sf: -1i16 as u16,
            energy: 12_345_678,
            energy_sf: 0,
            dc_current: 7654,
            dc_current_sf: -3i16 as u16,
            dc_voltage: 3805,
            dc_voltage_sf: -1i16 as u16,
            dc_power: 2912,
            dc_power_sf: 0,
            reserved: [0; 3],
            temp_sink: 4567,
            temp_sf: -2i16 as u16,
            status: 4,
            status_vendor: 0,
        }
    }
}

impl InverterFrame {
    pub fn words(&self) -> Vec<u16> {
        let mut words = Vec::with_capacity(38);
        words.extend_from_slice(&self.current);
        words.push(self.current_sf);
        words.extend_from_slice(&self.voltage);
        words.push(self.voltage_sf);
        words.extend_from_slice(&[self.power, self.power_sf]);
        words.extend_from_slice(&[self.freq, self.freq_sf]);
        words.extend_from_slice(&[self.va, self.va_sf]);
        words.extend_from_slice(&[self.var, self.var_sf]);
        words.extend_from_slice(&[self.pf, self.pf_sf]);
        push_u32(&mut words, self.energy);
        words.push(self.energy_sf);
        words.extend_from_slice(&[self.dc_current, self.dc_current_sf]);
        words.extend_from_slice(&[self.dc_voltage, self.dc_voltage_sf]);
        words.extend_from_slice(&[self.dc_power, self.dc_power_sf]);
        words.push(self.reserved[0]);
        words.push(self.temp_sink);
        words.extend_from_slice(&self.reserved[1..]);
        words.push(self.temp_sf);
        words.extend_from_slice(&[self.status, self.status_vendor]);
        debug_assert_eq!(words.len(), 38);
        words
    }

    pub fn block(&self) -> RawBlock {
        RawBlock::new(Block::Inverter.address(), self.words())
    }
}

/// Raw meter registers in wire order.
#[derive(Debug, Clone)]
pub struct MeterFrame {
    pub current: [u16; 4],
    pub current_sf: u16,
    /// LN, AN, BN, CN, LL, AB, BC, CA
    pub voltage: [u16; 8],
    pub voltage_sf: u16,
    pub freq: u16,
    pub freq_sf: u16,
    pub power: [u16; 4],
    pub power_sf: u16,
    pub va: [u16; 4],
    pub va_sf: u16,
    pub var: [u16; 4],
    pub var_sf: u16,
    pub pf: [u16; 4],
    pub pf_sf: u16,
    pub exported: [u32; 4],
    pub imported: [u32; 4],
    pub energy_sf: u16,
}

impl Default for MeterFrame {
    fn default() -> Self {
        Self {
            current: [523, 170, 180, 173],
            current_sf: -2i16 as u16,
            voltage: [2305, 2301, 2310, 2304, 3995, 3990, 4001, 3994],
            voltage_sf: -1i16 as u16,
            freq: 4998,
            freq_sf: -2i16 as u16,
            power: [
                -1500i16 as u16,
                -500i16 as u16,
                -520i16 as u16,
                -480i16 as u16,
            ],
            power_sf: 0,
            va: [1600, 540, 530, 530],
            va_sf: 0,
            var: [200, 70, 60, 70],
            var_sf: 0,
            pf: [950, 960, 940, 950],
            pf_sf: -1i16 as u16,
            exported: [1_234_567, 400_000, 410_000, 424_567],
            imported: [7_654_321, 2_000_000, 2_500_000, 3_154_321],
            energy_sf: 0,
        }
    }
}

impl MeterFrame {
    pub fn words(&self) -> Vec<u16> {
        let mut words = Vec::with_capacity(53);
        words.extend_from_slice(&self.current);
        words.push(self.current_sf);
        words.extend_from_slice(&self.voltage);
        words.push(self.voltage_sf);
        words.extend_from_slice(&[self.freq, self.freq_sf]);
        for (group, sf) in [
            (&self.power, self.power_sf),
            (&self.va, self.va_sf),
            (&self.var, self.var_sf),
            (&self.pf, self.pf_sf),
        ] {
            words.extend_from_slice(group);
            words.push(sf);
        }
        for value in self.exported.iter().chain(self.imported.iter()) {
            push_u32(&mut words, *value);
        }
        words.push(self.energy_sf);
        debug_assert_eq!(words.len(), 53);
        words
    }

    pub fn block(&self) -> RawBlock {
        RawBlock::new(Block::Meter.address(), self.words())
    }
}
