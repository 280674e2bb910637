use anyhow::Context;
use std::io::{BufRead, BufReader, BufWriter, Write};

/// Opens `input` for line-oriented reading.
///
/// `stdin` reads standard input; paths ending in `.gz` are decompressed on the fly.
///
/// ```
/// use std::io::BufRead;
/// let reader = psimod::reader("tests/psimod/groups.tsv").unwrap();
/// let lines = reader.lines().collect::<Vec<_>>();
/// assert_eq!(lines.len(), 11);
/// ```
pub fn reader(input: &str) -> anyhow::Result<Box<dyn BufRead>> {
    let reader: Box<dyn BufRead> = if input == "stdin" {
        Box::new(BufReader::new(std::io::stdin()))
    } else {
        let path = std::path::Path::new(input);
        let file = std::fs::File::open(path)
            .with_context(|| format!("could not open {}", path.display()))?;

        if path.extension() == Some(std::ffi::OsStr::new("gz")) {
            Box::new(BufReader::new(flate2::read::MultiGzDecoder::new(file)))
        } else {
            Box::new(BufReader::new(file))
        }
    };

    Ok(reader)
}

/// Opens `output` for writing; `stdout` writes to standard output.
pub fn writer(output: &str) -> anyhow::Result<Box<dyn Write>> {
    let writer: Box<dyn Write> = if output == "stdout" {
        Box::new(BufWriter::new(std::io::stdout()))
    } else {
        let file = std::fs::File::create(output)
            .with_context(|| format!("could not create {}", output))?;
        Box::new(BufWriter::new(file))
    };

    Ok(writer)
}

/// Lines that carry data: not blank and not starting with `#`.
pub fn data_lines(reader: Box<dyn BufRead>) -> impl Iterator<Item = std::io::Result<String>> {
    reader.lines().filter(|line| match line {
        Ok(l) => !l.trim().is_empty() && !l.starts_with('#'),
        Err(_) => true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use tempfile::tempdir;

    #[test]
    fn test_reader_plain_and_gz() {
        let dir = tempdir().unwrap();

        let plain = dir.path().join("psi.tsv");
        {
            let mut file = std::fs::File::create(&plain).unwrap();
            writeln!(file, "# comment").unwrap();
            writeln!(file, "s1\tA").unwrap();
            writeln!(file).unwrap();
            writeln!(file, "s2\tB").unwrap();
        }
        let lines: Vec<String> = data_lines(reader(plain.to_str().unwrap()).unwrap())
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(lines, vec!["s1\tA".to_string(), "s2\tB".to_string()]);

        let gz = dir.path().join("psi.tsv.gz");
        {
            let file = std::fs::File::create(&gz).unwrap();
            let mut encoder = GzEncoder::new(file, flate2::Compression::default());
            writeln!(encoder, "s1\tA").unwrap();
            encoder.finish().unwrap();
        }
        let lines: Vec<String> = reader(gz.to_str().unwrap())
            .unwrap()
            .lines()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(lines, vec!["s1\tA".to_string()]);
    }

    #[test]
    fn test_reader_missing_file() {
        let err = reader("tests/psimod/no_such_file.tsv").err().unwrap();
        assert!(err.to_string().contains("could not open"));
    }
}
