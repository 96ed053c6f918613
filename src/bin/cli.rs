//! This is the command line tool that loads an input file, streams its bits
//! through a mixer and reports how well the mixer predicted them.

extern crate clap;
extern crate env_logger;
extern crate log;

use clap::{value_parser, Arg, Command};
use lstm_mixer::utils::probability::{cost_bits, to_u16};
use lstm_mixer::{LstmMixer, MixerConfig, Predictor};

use std::fs;
use std::time::Instant;

/// A scoped utility struct for measuring and reporting time.
struct Timer {
    start: std::time::Instant,
}

impl Timer {
    fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        let now = Instant::now();
        if let Some(duration) = now.checked_duration_since(self.start) {
            log::info!(
                "Operation completed in {:03} seconds",
                duration.as_secs_f32()
            );
        }
    }
}

/// Turns the recent bit history into the input vector of the mixer: the last
/// 'len' bits as +1/-1 (0 before the start of the stream), followed by the
/// position of the next bit within its byte, scaled to [0, 1].
struct BitHistory {
    bits: u64,
    seen: usize,
    len: usize,
}

impl BitHistory {
    fn new(len: usize) -> Self {
        assert!(len < 64);
        Self {
            bits: 0,
            seen: 0,
            len,
        }
    }

    fn fill(&self, pos: usize, inputs: &mut [f32]) {
        debug_assert_eq!(inputs.len(), self.len + 1);
        for (i, val) in inputs[..self.len].iter_mut().enumerate() {
            *val = if i >= self.seen {
                0.
            } else if (self.bits >> i) & 1 == 1 {
                1.
            } else {
                -1.
            };
        }
        inputs[self.len] = pos as f32 / 7.;
    }

    fn push(&mut self, bit: u8) {
        self.bits = (self.bits << 1) | bit as u64;
        self.seen += 1;
    }

    fn clear(&mut self) {
        self.bits = 0;
        self.seen = 0;
    }
}

/// Summarizes a pass over the input.
#[derive(Default)]
struct Report {
    bits: usize,
    cost: f64,
    /// The cost when the probabilities are rounded to 16 bits, as a bitwise
    /// arithmetic coder would see them.
    coded_cost: f64,
    abs_error: f64,
}

fn evaluate<P: Predictor>(
    mixer: &mut P,
    history_len: usize,
    reset_every: usize,
    input: &[u8],
) -> lstm_mixer::Result<Report> {
    let mut history = BitHistory::new(history_len);
    let mut inputs = vec![0.; history_len + 1];
    let mut report = Report::default();

    for (i, byte) in input.iter().enumerate() {
        if reset_every > 0 && i > 0 && i % reset_every == 0 {
            log::debug!("Resetting the mixer state at byte {}", i);
            mixer.reset();
            history.clear();
        }

        // Feed the bits of the byte, MSB first.
        for pos in 0..8 {
            let bit = (byte >> (7 - pos)) & 1;
            history.fill(pos, &mut inputs);
            let p = mixer.predict(&inputs)?;
            report.cost += cost_bits(p, bit);
            report.coded_cost += cost_bits(to_u16(p) as f32 / 65536., bit);
            report.abs_error += (bit as f64 - p as f64).abs();
            mixer.learn(bit)?;
            history.push(bit);
        }
        report.bits += 8;
    }
    Ok(report)
}

fn main() {
    let matches = Command::new("CLI")
        .version("1.x")
        .arg(
            Arg::new("cells")
                .long("cells")
                .value_name("N")
                .help("Number of memory cells in the mixer")
                .value_parser(value_parser!(usize))
                .default_value("32"),
        )
        .arg(
            Arg::new("rate")
                .long("rate")
                .value_name("R")
                .help("Learning rate of the mixer")
                .value_parser(value_parser!(f32))
                .default_value("0.02"),
        )
        .arg(
            Arg::new("history")
                .long("history")
                .value_name("K")
                .help("Number of previous bits fed to the mixer")
                .value_parser(value_parser!(u64).range(1..64))
                .default_value("16"),
        )
        .arg(
            Arg::new("seed")
                .long("seed")
                .value_name("S")
                .help("Seed of the weight initialization")
                .value_parser(value_parser!(u64))
                .default_value("0"),
        )
        .arg(
            Arg::new("reset-every")
                .long("reset-every")
                .value_name("B")
                .help("Reset the recurrent state every B bytes (0 = never)")
                .value_parser(value_parser!(usize))
                .default_value("0"),
        )
        .arg(
            Arg::new("INPUT")
                .help("Sets the input file to use")
                .required(true)
                .index(1),
        )
        .get_matches();

    env_logger::builder().format_timestamp(None).init();

    let cells = *matches.get_one::<usize>("cells").unwrap();
    let rate = *matches.get_one::<f32>("rate").unwrap();
    let history_len = *matches.get_one::<u64>("history").unwrap() as usize;
    let seed = *matches.get_one::<u64>("seed").unwrap();
    let reset_every = *matches.get_one::<usize>("reset-every").unwrap();
    let input_path = matches.get_one::<String>("INPUT").unwrap();
    let input = fs::read(input_path).expect("Can't open the input file");

    let config = MixerConfig::new(history_len + 1, cells, rate).with_seed(seed);
    let mut mixer = match LstmMixer::with_config(config) {
        Ok(mixer) => mixer,
        Err(err) => {
            log::error!("{}", err);
            std::process::exit(1);
        }
    };

    log::info!(
        "Mixing {} bytes with {} cells and a history of {} bits",
        input.len(),
        cells,
        history_len
    );
    let x = Timer::new();

    let report = match evaluate(&mut mixer, history_len, reset_every, &input) {
        Ok(report) => report,
        Err(err) => {
            log::error!("Mixing failed: {}", err);
            std::process::exit(1);
        }
    };

    if report.bits == 0 {
        log::info!("The input is empty.");
        return;
    }

    let bytes = report.cost / 8.;
    log::info!("Ideal coding cost is {:.0} bytes.", bytes.ceil());
    log::info!(
        "That is {:.4} bits per byte, a ratio of {:.4}x.",
        report.cost * 8. / report.bits as f64,
        input.len() as f64 / bytes
    );
    log::info!(
        "With 16-bit probabilities the cost is {:.0} bytes.",
        (report.coded_cost / 8.).ceil()
    );
    log::info!(
        "Mean absolute error is {:.4}.",
        report.abs_error / report.bits as f64
    );
    log::info!("{} values were clipped.", mixer.clip_events());

    drop(x);
}
