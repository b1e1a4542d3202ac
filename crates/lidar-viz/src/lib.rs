use indicatif::{ProgressBar, ProgressStyle};

/// Initializes logging, at the `info` level unless `RUST_LOG` says otherwise.
pub fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}

/// Creates a progress bar over `len` frames.
pub fn frame_progress_bar(len: usize) -> ProgressBar {
    let bar = ProgressBar::new(len as u64);
    let style = ProgressStyle::default_bar()
        .template("[{elapsed}] [ETA: {eta}] [{wide_bar}] [{percent}%] {human_pos}/{human_len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    bar.set_style(style);
    bar
}

/// Parses a comma separated vector such as `0,-200,200`.
pub fn parse_vector(value: &str) -> Result<[f64; 3], String> {
    let components = value
        .split(',')
        .map(|c| c.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| format!("invalid vector '{value}': {err}"))?;

    match components[..] {
        [x, y, z] if components.iter().all(|c| c.is_finite()) => Ok([x, y, z]),
        _ => Err(format!("expected 3 finite comma separated numbers, got '{value}'")),
    }
}

/// Parses a resolution such as `800x600`.
pub fn parse_resolution(value: &str) -> Result<(u32, u32), String> {
    let invalid = || format!("expected a resolution like 800x600, got '{value}'");
    let (width, height) = value.split_once(['x', 'X']).ok_or_else(invalid)?;
    let width = width.trim().parse::<u32>().map_err(|_| invalid())?;
    let height = height.trim().parse::<u32>().map_err(|_| invalid())?;
    if width == 0 || height == 0 {
        return Err(invalid());
    }
    Ok((width, height))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_vector() {
        assert_eq!(parse_vector("0,-200,200"), Ok([0.0, -200.0, 200.0]));
        assert_eq!(parse_vector(" 1.5, 2 ,3 "), Ok([1.5, 2.0, 3.0]));
        assert!(parse_vector("1,2").is_err());
        assert!(parse_vector("1,2,inf").is_err());
        assert!(parse_vector("a,b,c").is_err());
    }

    #[test]
    fn test_parse_resolution() {
        assert_eq!(parse_resolution("800x600"), Ok((800, 600)));
        assert_eq!(parse_resolution("1920X1080"), Ok((1920, 1080)));
        assert!(parse_resolution("800").is_err());
        assert!(parse_resolution("0x600").is_err());
    }
}
