//! Sensor simulado de temperatura/umidade.
//!
//! Imita um transmissor Modbus RTU: registradores de entrada 0 (temperatura)
//! e 1 (umidade), ambos em décimos. Os valores oscilam numa onda triangular
//! determinística em torno da base, o suficiente para exercitar o bridge
//! sem hardware conectado.

use thlog_core::Reading;

/// Meio período da oscilação (leituras).
const HALF_PERIOD: u32 = 30;

/// Fonte de registradores simulada.
pub struct SimulatedSensor {
    tick: u32,
    /// Temperatura base (décimos de °C)
    base_temp: u16,
    /// Umidade base (décimos de %)
    base_humi: u16,
}

impl SimulatedSensor {
    pub fn new() -> Self {
        Self {
            tick: 0,
            base_temp: 215,
            base_humi: 402,
        }
    }

    /// Lê os registradores `[temperatura, umidade]` em décimos.
    pub fn read_registers(&mut self) -> [u16; 2] {
        let offset = triangle(self.tick);
        self.tick = self.tick.wrapping_add(1);
        [
            offset_by(self.base_temp, offset),
            offset_by(self.base_humi, -offset),
        ]
    }

    /// Coleta uma leitura completa, já escalada.
    pub fn collect(&mut self, device_id: &str, ts: String) -> Reading {
        let [raw_temp, raw_humi] = self.read_registers();
        Reading::from_registers(device_id, ts, raw_temp, raw_humi)
    }
}

/// Onda triangular em `[-HALF_PERIOD/2, HALF_PERIOD/2]`.
fn triangle(tick: u32) -> i32 {
    let p = tick % (2 * HALF_PERIOD);
    let up = if p < HALF_PERIOD { p } else { 2 * HALF_PERIOD - p };
    up as i32 - (HALF_PERIOD / 2) as i32
}

fn offset_by(base: u16, offset: i32) -> u16 {
    (i32::from(base) + offset).clamp(0, i32::from(u16::MAX)) as u16
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────
