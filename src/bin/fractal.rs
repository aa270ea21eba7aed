// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

#[macro_use]
extern crate clap;
extern crate env_logger;
extern crate fractals;
extern crate num;
extern crate num_cpus;

use clap::{App, Arg, ArgMatches};
use fractals::{Formula, OutputFormat, Rounding, Settings};
use num::Complex;
use std::path::PathBuf;
use std::str::FromStr;

/// Given a string and a separator, returns every value between the
/// separators, or None if any of them fails to parse.
fn parse_list<T: FromStr>(s: &str, separator: char) -> Option<Vec<T>> {
    s.split(separator)
        .map(|part| T::from_str(part.trim()).ok())
        .collect()
}

fn parse_pair<T: FromStr>(s: &str, separator: char) -> Option<(T, T)> {
    let mut values = parse_list::<T>(s, separator)?;
    if values.len() != 2 {
        return None;
    }
    let r = values.remove(1);
    let l = values.remove(0);
    Some((l, r))
}

fn parse_complex(s: &str) -> Option<Complex<f64>> {
    parse_pair(s, ',').map(|(re, im)| Complex { re, im })
}

fn parse_bounds(s: &str) -> Option<[f64; 4]> {
    match parse_list::<f64>(s, ',') {
        Some(ref v) if v.len() == 4 => Some([v[0], v[1], v[2], v[3]]),
        _ => None,
    }
}

fn validate_number<T: FromStr>(s: &str, err: &str) -> Result<(), String> {
    match T::from_str(s) {
        Ok(_) => Ok(()),
        Err(_) => Err(err.to_string()),
    }
}

fn validate_range<T: FromStr + Ord>(
    s: &str,
    low: T,
    high: T,
    isnotanumber_err: &str,
    isnotinrange_err: &str,
) -> Result<(), String> {
    match T::from_str(s) {
        Ok(i) => {
            if i >= low && i <= high {
                Ok(())
            } else {
                Err(isnotinrange_err.to_string())
            }
        }
        Err(_) => Err(isnotanumber_err.to_string()),
    }
}

const OUTPUT: &str = "output";
const REGION: &str = "region";
const DENSITY: &str = "density";
const TILE_SIZE: &str = "tile-size";
const ITERATIONS: &str = "iterations";
const THRESHOLD: &str = "threshold";
const FORMULA: &str = "formula";
const CONSTANT: &str = "constant";
const CEIL: &str = "ceil";
const THREADS: &str = "threads";

fn args<'a>() -> ArgMatches<'a> {
    let max_threads = num_cpus::get();

    App::new("fractal")
        .version(crate_version!())
        .about("Tiled escape-time fractal renderer")
        .arg(
            Arg::with_name(OUTPUT)
                .long(OUTPUT)
                .short("o")
                .takes_value(true)
                .default_value("fractal.jpg")
                .help("Output file; .pnm or .ppm writes a pixmap, anything else a JPEG"),
        )
        .arg(
            Arg::with_name(REGION)
                .long(REGION)
                .short("r")
                .takes_value(true)
                .allow_hyphen_values(true)
                .default_value("-1,1,-1,1")
                .validator(|s| match parse_bounds(&s) {
                    Some(_) => Ok(()),
                    None => Err("Could not parse region; expected XMIN,XMAX,IMIN,IMAX".to_string()),
                })
                .help("Region of the complex plane to render"),
        )
        .arg(
            Arg::with_name(DENSITY)
                .long(DENSITY)
                .short("d")
                .takes_value(true)
                .allow_hyphen_values(true)
                .default_value("0.01")
                .validator(|s| validate_number::<f64>(&s, "Could not parse density"))
                .help("Distance between adjacent samples"),
        )
        .arg(
            Arg::with_name(TILE_SIZE)
                .long(TILE_SIZE)
                .short("g")
                .takes_value(true)
                .default_value("100")
                .validator(|s| {
                    validate_range(
                        &s,
                        1,
                        10_000,
                        "Could not parse tile size",
                        "Tile size must be between 1 and 10000",
                    )
                })
                .help("Edge length of a tile, in samples"),
        )
        .arg(
            Arg::with_name(ITERATIONS)
                .long(ITERATIONS)
                .short("i")
                .takes_value(true)
                .default_value("30")
                .validator(|s| {
                    validate_range(
                        &s,
                        0,
                        100_000,
                        "Could not parse iteration count",
                        "Iteration count must be between 0 and 100000",
                    )
                })
                .help("Iterations per sample"),
        )
        .arg(
            Arg::with_name(THRESHOLD)
                .long(THRESHOLD)
                .takes_value(true)
                .default_value("3")
                .validator(|s| validate_number::<f64>(&s, "Could not parse threshold"))
                .help("Bound on |z|^2 for a sample to count as inside the set"),
        )
        .arg(
            Arg::with_name(FORMULA)
                .long(FORMULA)
                .short("f")
                .takes_value(true)
                .possible_values(&["julia", "mandelbrot"])
                .default_value("julia")
                .help("Recurrence to iterate"),
        )
        .arg(
            Arg::with_name(CONSTANT)
                .long(CONSTANT)
                .short("c")
                .takes_value(true)
                .allow_hyphen_values(true)
                .default_value("-0.4,0.6")
                .validator(|s| match parse_complex(&s) {
                    Some(_) => Ok(()),
                    None => Err("Could not parse Julia constant; expected RE,IM".to_string()),
                })
                .help("Constant of the Julia recurrence"),
        )
        .arg(
            Arg::with_name(CEIL)
                .long(CEIL)
                .help("Round per-tile sample counts up instead of down"),
        )
        .arg(
            Arg::with_name(THREADS)
                .long(THREADS)
                .short("t")
                .takes_value(true)
                .default_value("1")
                .validator(move |s| {
                    validate_range(
                        &s,
                        1,
                        max_threads,
                        "Could not parse thread count",
                        &format!("Thread count must be between 1 and {}", max_threads),
                    )
                })
                .help("Number of threads rendering tiles"),
        )
        .get_matches()
}

/// Every value has been checked by a validator, so a parse failure
/// here means a validator and its parser disagree.
fn settings(matches: &ArgMatches) -> Result<Settings, String> {
    let output = PathBuf::from(matches.value_of(OUTPUT).unwrap_or("fractal.jpg"));
    let bounds = matches
        .value_of(REGION)
        .and_then(parse_bounds)
        .ok_or_else(|| "Error parsing region".to_string())?;
    let formula = match matches.value_of(FORMULA) {
        Some("mandelbrot") => Formula::Mandelbrot,
        _ => Formula::Julia(
            matches
                .value_of(CONSTANT)
                .and_then(parse_complex)
                .ok_or_else(|| "Error parsing Julia constant".to_string())?,
        ),
    };
    let rounding = if matches.is_present(CEIL) {
        Rounding::Ceil
    } else {
        Rounding::Floor
    };

    Ok(Settings {
        bounds,
        density: value_t!(matches, DENSITY, f64).map_err(|e| e.to_string())?,
        tile_size: value_t!(matches, TILE_SIZE, usize).map_err(|e| e.to_string())?,
        formula,
        iterations: value_t!(matches, ITERATIONS, usize).map_err(|e| e.to_string())?,
        threshold: value_t!(matches, THRESHOLD, f64).map_err(|e| e.to_string())?,
        rounding,
        threads: value_t!(matches, THREADS, usize).map_err(|e| e.to_string())?,
        format: OutputFormat::from_path(&output),
        output,
        ..Settings::default()
    })
}

fn main() {
    env_logger::init();
    let matches = args();

    let settings = match settings(&matches) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = settings.run() {
        eprintln!("Render failure: {}", e);
        std::process::exit(1);
    }
}
