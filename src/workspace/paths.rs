use std::path::{Component, Path, PathBuf};

/// Makes `path` absolute against the current directory and resolves `.` and
/// `..` lexically. Symlinks are not followed, so paths to files that don't
/// exist yet normalize the same way as existing ones.
pub fn normalize_path(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        match std::env::current_dir() {
            Ok(cwd) => cwd.join(path),
            Err(_) => path.to_path_buf(),
        }
    };

    let mut out = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let at_root = matches!(
                    out.components().next_back(),
                    None | Some(Component::RootDir) | Some(Component::Prefix(_))
                );
                if !at_root {
                    out.pop();
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removes_dot_segments() {
        assert_eq!(
            normalize_path(Path::new("/repo/src/./billing/../A.cs")),
            PathBuf::from("/repo/src/A.cs")
        );
        assert_eq!(normalize_path(Path::new("/../A.cs")), PathBuf::from("/A.cs"));
    }

    #[test]
    fn relative_paths_become_absolute() {
        let normalized = normalize_path(Path::new("src/A.cs"));
        assert!(normalized.is_absolute());
        assert!(normalized.ends_with("src/A.cs"));
    }
}
