//! Synthetic CSV generators for benchmarking and manual testing.
//!
//! Rows are streamed to the writer so multi-gigabyte files can be produced
//! without holding them in memory.

use std::io::{self, Write};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

#[derive(Debug, Clone, Copy)]
pub enum CsvPattern {
    /// Standard tabular data with mixed types
    Tabular,
    /// User/person records (realistic structure)
    Users,
    /// Numeric-heavy data (financial, scientific)
    Numeric,
    /// Quoted fields containing delimiters
    Quoted,
    /// Rows whose field count differs from the header
    Ragged,
}

/// Write a header plus `rows` data rows.
pub fn generate_csv<W: Write>(
    out: &mut W,
    rows: u64,
    pattern: CsvPattern,
    seed: Option<u64>,
) -> io::Result<()> {
    let mut rng = seed.map(ChaCha8Rng::seed_from_u64);
    match pattern {
        CsvPattern::Tabular => generate_tabular(out, rows, &mut rng),
        CsvPattern::Users => generate_users(out, rows, &mut rng),
        CsvPattern::Numeric => generate_numeric(out, rows, &mut rng),
        CsvPattern::Quoted => generate_quoted(out, rows, &mut rng),
        CsvPattern::Ragged => generate_ragged(out, rows, &mut rng),
    }
}

fn generate_tabular<W: Write>(
    out: &mut W,
    rows: u64,
    rng: &mut Option<ChaCha8Rng>,
) -> io::Result<()> {
    writeln!(out, "id,name,email,age,score,active,created")?;
    for row_id in 1..=rows {
        let age = rng.as_mut().map(|r| r.gen_range(18..80)).unwrap_or(25);
        let score = rng
            .as_mut()
            .map(|r| r.gen_range(0..10000))
            .unwrap_or(row_id * 10);
        let active = rng
            .as_mut()
            .map(|r| r.r#gen::<bool>())
            .unwrap_or(row_id % 2 == 0);
        let day = (row_id % 28) + 1;
        let month = (row_id % 12) + 1;

        writeln!(
            out,
            "{},User{},user{}@example.com,{},{},{},2024-{:02}-{:02}",
            row_id, row_id, row_id, age, score, active, month, day
        )?;
    }
    Ok(())
}

fn generate_users<W: Write>(
    out: &mut W,
    rows: u64,
    rng: &mut Option<ChaCha8Rng>,
) -> io::Result<()> {
    let first_names = [
        "Alice", "Bob", "Charlie", "Diana", "Eve", "Frank", "Grace", "Henry", "Ivy", "Jack",
    ];
    let last_names = [
        "Smith", "Johnson", "Williams", "Brown", "Jones", "Garcia", "Miller", "Davis", "Wilson",
        "Moore",
    ];
    let cities = [
        "New York",
        "Los Angeles",
        "Chicago",
        "Houston",
        "Phoenix",
        "Philadelphia",
    ];

    writeln!(out, "id,first_name,last_name,email,city,age,salary")?;
    for row_id in 1..=rows {
        let i = row_id as usize;
        let first = first_names[i % first_names.len()];
        let last = last_names[(i / 10) % last_names.len()];
        let city = cities[i % cities.len()];
        let age = rng.as_mut().map(|r| r.gen_range(22..65)).unwrap_or(30);
        let salary = rng
            .as_mut()
            .map(|r| r.gen_range(30000..200000))
            .unwrap_or(50000);

        writeln!(
            out,
            "{},{},{},{}.{}@example.com,{},{},{}",
            row_id,
            first,
            last,
            first.to_lowercase(),
            last.to_lowercase(),
            city,
            age,
            salary
        )?;
    }
    Ok(())
}

fn generate_numeric<W: Write>(
    out: &mut W,
    rows: u64,
    rng: &mut Option<ChaCha8Rng>,
) -> io::Result<()> {
    writeln!(out, "id,value1,value2,value3,total")?;
    for row_id in 1..=rows {
        let base = row_id as f64;
        let mut value = |scale: f64| {
            rng.as_mut()
                .map(|r| r.r#gen::<f64>() * 1000.0)
                .unwrap_or(base * scale)
        };
        let v1 = value(1.0);
        let v2 = value(1.5);
        let v3 = value(2.0);

        writeln!(
            out,
            "{},{:.4},{:.4},{:.4},{:.4}",
            row_id,
            v1,
            v2,
            v3,
            v1 + v2 + v3
        )?;
    }
    Ok(())
}

fn generate_quoted<W: Write>(
    out: &mut W,
    rows: u64,
    rng: &mut Option<ChaCha8Rng>,
) -> io::Result<()> {
    let street_names = [
        "Main St", "Oak Ave", "Maple Dr", "Cedar Ln", "Pine Rd", "Elm Blvd",
    ];
    let cities = ["New York", "Los Angeles", "Chicago", "Houston", "Seattle"];

    writeln!(out, "id,name,address,notes")?;
    for row_id in 1..=rows {
        let i = row_id as usize;
        let street_num = rng.as_mut().map(|r| r.gen_range(1..9999)).unwrap_or(123);
        let street = street_names[i % street_names.len()];
        let city = cities[i % cities.len()];
        let zip = 10000 + (row_id % 90000);

        let notes = if row_id % 3 == 0 {
            "Note with, delimiter".to_string()
        } else {
            format!("Simple note {}", row_id)
        };

        writeln!(
            out,
            "{},\"User{} Name\",\"{} {}, {}, {}\",\"{}\"",
            row_id, row_id, street_num, street, city, zip, notes
        )?;
    }
    Ok(())
}

fn generate_ragged<W: Write>(
    out: &mut W,
    rows: u64,
    rng: &mut Option<ChaCha8Rng>,
) -> io::Result<()> {
    writeln!(out, "a,b,c,d")?;
    for row_id in 1..=rows {
        let fields = rng
            .as_mut()
            .map(|r| r.gen_range(1..8))
            .unwrap_or((row_id % 7 + 1) as usize);
        let line = (0..fields)
            .map(|f| format!("r{}f{}", row_id, f))
            .collect::<Vec<_>>()
            .join(",");
        writeln!(out, "{}", line)?;
    }
    Ok(())
}
