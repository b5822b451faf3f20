use std::path::PathBuf;

use envlog_converter::data::sample::{render_raw_log, RawReading, RawScalar};

fn gaussian(x: f64, mu: f64, sigma: f64, amplitude: f64) -> f64 {
    amplitude * (-(x - mu).powi(2) / (2.0 * sigma.powi(2))).exp()
}

fn generate_spectrum(
    wavelengths: &[f64],
    peaks: &[(f64, f64, f64)],
    noise_level: f64,
    noise: &mut SensorNoise,
) -> Vec<f64> {
    wavelengths
        .iter()
        .map(|&wl| {
            let signal: f64 = peaks
                .iter()
                .map(|&(mu, sigma, amp)| gaussian(wl, mu, sigma, amp))
                .sum();
            (signal + noise.jitter(0.0, noise_level)).max(0.0)
        })
        .collect()
}

/// Seeded detector and sensor noise, so repeated runs write identical logs.
///
/// xoshiro256** over a state seeded with an LCG; Box-Muller for normal draws.
struct SensorNoise {
    s: [u64; 4],
}

impl SensorNoise {
    fn seeded(seed: u64) -> Self {
        let mut x = seed;
        let s = std::array::from_fn(|_| {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            x
        });
        SensorNoise { s }
    }

    fn next_bits(&mut self) -> u64 {
        let [a, b, c, d] = &mut self.s;
        let out = b.wrapping_mul(5).rotate_left(7).wrapping_mul(9);
        let shifted = *b << 17;
        *c ^= *a;
        *d ^= *b;
        *b ^= *c;
        *a ^= *d;
        *c ^= shifted;
        *d = d.rotate_left(45);
        out
    }

    /// Uniform in [0, 1).
    fn unit(&mut self) -> f64 {
        (self.next_bits() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn jitter(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.unit().max(1e-15);
        let u2 = self.unit();
        mean + std_dev * (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
    }
}

/// Writes a synthetic raw environment log: one reading every 5 s over one
/// minute, with a sunlight-like spectrum whose amplitude drifts over time.
///
/// Usage: `generate_sample [OUTPUT]` (default `sample_environmentlogger.json`)
fn main() -> anyhow::Result<()> {
    let output = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("sample_environmentlogger.json"));

    let mut noise = SensorNoise::seeded(42);

    // Wavelengths: 337 → 822 nm, step ~0.5 nm
    let wavelengths: Vec<f64> = (0..970).map(|i| 337.0 + i as f64 * 0.5).collect();
    let peaks = [(480.0, 60.0, 9000.0), (560.0, 40.0, 6000.0), (760.0, 25.0, 2500.0)];

    let readings: Vec<RawReading> = (0..12)
        .map(|i| {
            let drift = 1.0 + 0.02 * i as f64;
            let scaled: Vec<(f64, f64, f64)> = peaks
                .iter()
                .map(|&(mu, sigma, amp)| (mu, sigma, amp * drift))
                .collect();
            let spectrum = generate_spectrum(&wavelengths, &scaled, 40.0, &mut noise);
            let temperature = 21.5 + noise.jitter(0.0, 0.1);

            RawReading {
                timestamp: format!("2016.04.07-12:00:{:02}", i * 5),
                text_fields: vec![("weather station".into(), "Thies Clima".into())],
                scalars: vec![
                    RawScalar {
                        name: "temperature".into(),
                        value: (temperature * 100.0).round() / 100.0,
                        raw_value: Some((temperature * 100.0).round()),
                        unit: Some("DegCelsius".into()),
                    },
                    RawScalar {
                        name: "relative humidity".into(),
                        value: 38.0 + i as f64 * 0.1,
                        raw_value: None,
                        unit: Some("relHumPerCent".into()),
                    },
                    RawScalar {
                        name: "sensor par".into(),
                        value: 812.0 * drift,
                        raw_value: Some((4096.0 * drift).round()),
                        unit: Some("?mol/(m^2*s)".into()),
                    },
                ],
                max_fixed_intensity: 16383,
                integration_time_us: 5000,
                wavelengths: wavelengths.clone(),
                spectrum: spectrum.iter().map(|v| v.round()).collect(),
            }
        })
        .collect();

    std::fs::write(&output, render_raw_log(&readings))?;
    println!(
        "Wrote {} readings ({} wavelengths each) to {}",
        readings.len(),
        wavelengths.len(),
        output.display()
    );
    Ok(())
}
