//! Output file naming.
//!
//! Templates sharing a file name are numbered in discovery order: the first
//! keeps `<stem>.<ext>`, later ones get `<stem>.<n>.<ext>` with `n` counting
//! from 1. A number whose name another template already produced is skipped,
//! so `report.1.sgtt` and a second `report.sgtt` never share `report.1.cs`.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// Output file name for each template, in the same order.
pub fn output_names(templates: &[PathBuf], output_extension: &str) -> Vec<String> {
    let mut next: HashMap<String, usize> = HashMap::new();
    let mut taken: HashSet<String> = HashSet::new();
    templates
        .iter()
        .map(|template| {
            let key = template
                .file_name()
                .map(|n| n.to_string_lossy().to_lowercase())
                .unwrap_or_default();
            let number = next.entry(key).or_insert(0);
            loop {
                let name = output_name(template, *number, output_extension);
                *number += 1;
                if taken.insert(name.to_lowercase()) {
                    return name;
                }
            }
        })
        .collect()
}

/// `<stem>.<ext>` for number 0, `<stem>.<number>.<ext>` otherwise.
pub fn output_name(template: &Path, number: usize, output_extension: &str) -> String {
    let stem = template
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    if number == 0 {
        format!("{stem}.{output_extension}")
    } else {
        format!("{stem}.{number}.{output_extension}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicates_are_numbered_in_order() {
        let templates = vec![
            PathBuf::from("/p/a/report.sgtt"),
            PathBuf::from("/p/a/summary.sgtt"),
            PathBuf::from("/p/b/report.sgtt"),
            PathBuf::from("/p/c/Report.sgtt"),
        ];
        assert_eq!(
            output_names(&templates, "cs"),
            vec!["report.cs", "summary.cs", "report.1.cs", "Report.2.cs"]
        );
    }

    #[test]
    fn test_numbered_names_do_not_collide() {
        let templates = vec![
            PathBuf::from("/p/a/report.1.sgtt"),
            PathBuf::from("/p/a/report.sgtt"),
            PathBuf::from("/p/b/report.sgtt"),
        ];
        assert_eq!(
            output_names(&templates, "cs"),
            vec!["report.1.cs", "report.cs", "report.2.cs"]
        );

        let templates = vec![
            PathBuf::from("/p/a/report.sgtt"),
            PathBuf::from("/p/b/report.sgtt"),
            PathBuf::from("/p/c/report.1.sgtt"),
        ];
        assert_eq!(
            output_names(&templates, "cs"),
            vec!["report.cs", "report.1.cs", "report.1.1.cs"]
        );
    }

    #[test]
    fn test_output_name() {
        assert_eq!(output_name(Path::new("x/gen.sgtt"), 0, "g.cs"), "gen.g.cs");
        assert_eq!(output_name(Path::new("x/gen.sgtt"), 3, "cs"), "gen.3.cs");
    }
}
