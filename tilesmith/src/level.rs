//! Plain-text level files: one `<asset_id> <x> <y>` triple per line.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};

use crate::assets::AssetId;
use crate::error::EngineError;
use crate::math::Vec2;
use crate::world::World;

/// Whether loading clears the world first.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LoadMode {
    #[default]
    Replace,
    Append,
}

/// Parse one level line into its triple.
pub fn parse_line(line: &str) -> Option<(AssetId, Vec2)> {
    let mut tokens = line.split_whitespace();
    let id = tokens.next()?.parse().ok()?;
    let x = tokens.next()?.parse().ok()?;
    let y = tokens.next()?.parse().ok()?;
    Some((id, Vec2::new(x, y)))
}

/// Feed every line of a level to `spawn`, in file order.
///
/// A blank line ends the level. A line that does not parse stops the load
/// with [`EngineError::MalformedLevelLine`]; objects spawned from earlier
/// lines stay. Returns the number of lines handed to `spawn`.
pub fn read_level<R, F>(reader: R, mut spawn: F) -> Result<usize>
where
    R: BufRead,
    F: FnMut(AssetId, Vec2) -> Result<()>,
{
    let mut count = 0;
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            break;
        }

        let (id, location) = parse_line(&line).ok_or_else(|| EngineError::MalformedLevelLine {
            line: index + 1,
            content: line.clone(),
        })?;
        spawn(id, location)?;
        count += 1;
    }
    Ok(count)
}

/// Write the world's game objects in sequence order.
pub fn write_level<W: Write>(mut writer: W, world: &World) -> Result<usize> {
    let mut count = 0;
    for (_, object) in world.objects() {
        let location = object.location();
        writeln!(writer, "{} {} {}", object.asset_id, location.x, location.y)?;
        count += 1;
    }
    writer.flush()?;
    Ok(count)
}

pub fn load_level<F>(path: &Path, spawn: F) -> Result<usize>
where
    F: FnMut(AssetId, Vec2) -> Result<()>,
{
    let file = File::open(path).map_err(|_| EngineError::ResourceMissing {
        path: path.to_path_buf(),
    })?;
    read_level(BufReader::new(file), spawn)
}

pub fn save_level(path: &Path, world: &World) -> Result<usize> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let file = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let count = write_level(BufWriter::new(file), world)?;
    log::info!("saved {count} objects to {}", path.display());
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(text: &str) -> (Result<usize>, Vec<(AssetId, Vec2)>) {
        let mut spawned = Vec::new();
        let result = read_level(text.as_bytes(), |id, location| {
            spawned.push((id, location));
            Ok(())
        });
        (result, spawned)
    }

    #[test]
    fn lines_spawn_in_file_order() {
        let (result, spawned) = collect("1 0 0\n2 320 0\n1 640 0");
        assert_eq!(result.unwrap(), 3);
        assert_eq!(
            spawned,
            vec![
                (1, Vec2::new(0.0, 0.0)),
                (2, Vec2::new(320.0, 0.0)),
                (1, Vec2::new(640.0, 0.0)),
            ]
        );
    }

    #[test]
    fn trailing_blank_lines_are_tolerated() {
        let (result, spawned) = collect("4 10 20\n\n\n");
        assert_eq!(result.unwrap(), 1);
        assert_eq!(spawned.len(), 1);
    }

    #[test]
    fn short_line_aborts_after_earlier_spawns() {
        let (result, spawned) = collect("1 0 0\n2 32\n3 64 64\n");
        let err = result.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<EngineError>(),
            Some(EngineError::MalformedLevelLine { line: 2, .. })
        ));
        assert_eq!(spawned, vec![(1, Vec2::ZERO)]);
    }

    #[test]
    fn negative_ids_do_not_parse() {
        assert_eq!(parse_line("-1 0 0"), None);
        assert_eq!(parse_line("7 1.5 -2"), Some((7, Vec2::new(1.5, -2.0))));
    }

    #[test]
    fn missing_file_is_a_resource_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_level(&dir.path().join("nope.txt"), |_, _| Ok(())).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<EngineError>(),
            Some(EngineError::ResourceMissing { .. })
        ));
    }
}
