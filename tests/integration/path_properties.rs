use nbcontents::naming;
use nbcontents::path::{ContentRoot, LogicalPath};
use proptest::prelude::*;
use std::collections::HashSet;
use std::path::PathBuf;

fn segment() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_][a-zA-Z0-9_ .-]{0,8}".prop_filter("dot segments are dropped", |s| {
        s != "." && s != ".."
    })
}

fn slashes() -> impl Strategy<Value = String> {
    (1usize..4).prop_map(|n| "/".repeat(n))
}

proptest! {
    #[test]
    fn resolution_ignores_extra_slashes(
        segments in prop::collection::vec(segment(), 0..5),
        separators in prop::collection::vec(slashes(), 6),
        leading in prop::bool::ANY,
        trailing in prop::bool::ANY,
    ) {
        let root = ContentRoot::new("/srv/content");
        let plain = segments.join("/");

        let mut noisy = String::new();
        if leading {
            noisy.push_str(&separators[0]);
        }
        for (i, segment) in segments.iter().enumerate() {
            if i > 0 {
                noisy.push_str(&separators[i]);
            }
            noisy.push_str(segment);
        }
        if trailing {
            noisy.push_str(&separators[5]);
        }

        prop_assert_eq!(root.resolve(None, &noisy), root.resolve(None, &plain));
        prop_assert_eq!(LogicalPath::parse(&noisy), LogicalPath::parse(&plain));

        let expected = segments
            .iter()
            .fold(PathBuf::from("/srv/content"), |acc, s| acc.join(s));
        prop_assert_eq!(root.resolve(None, &noisy), expected);
    }

    #[test]
    fn allocator_returns_first_gap(taken in 0u64..40, base in "[a-z]{1,6}") {
        let root = ContentRoot::new("/srv/content");
        let occupied: HashSet<PathBuf> = (0..taken)
            .map(|i| root.resolve(Some(&format!("{}{}", base, i)), "dir"))
            .collect();

        let name = naming::allocate(&root, &base, "dir", |location| occupied.contains(location));
        prop_assert_eq!(name, format!("{}{}", base, taken));
    }
}

#[test]
fn allocator_with_suffix_skips_existing_notebooks() {
    let root = ContentRoot::new("/srv/content");
    let occupied: HashSet<PathBuf> = ["Untitled0.ipynb", "Untitled1.ipynb"]
        .iter()
        .map(|n| root.resolve(Some(n), "/"))
        .collect();
    let name = naming::allocate_with_suffix(&root, "Untitled", ".ipynb", "/", |location| {
        occupied.contains(location)
    });
    assert_eq!(name, "Untitled2.ipynb");
}
