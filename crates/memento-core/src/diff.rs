//! Path-addressed structural diffing and application.
//!
//! The diff engine operates purely over [`CanonicalValue`] trees: it never
//! touches storage or the graph layer, which is what lets the snapshot
//! store and the rollback engine share one diff representation.

use std::collections::HashMap;

use crate::canonical::CanonicalValue;

/// Object/map keys ignored by a diff or equality check unless the caller
/// overrides [`DiffOptions::ignore_keys`].
const DEFAULT_IGNORE_KEYS: [&str; 3] = ["__timestamp", "__version", "__metadata"];

/// Recursion depth below which [`generate_object_diff`]/[`deep_equals_opts`]
/// stop descending, silently truncating anything deeper. Bounds recursion
/// on cyclic or pathologically deep data without tracking visited nodes.
const DEFAULT_MAX_DEPTH: usize = 10;

/// One step of a path into a [`CanonicalValue`] tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    /// An object/map key.
    Key(String),
    /// An array/set index.
    Index(usize),
}

impl std::fmt::Display for PathSegment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Key(key) => write!(f, ".{key}"),
            Self::Index(index) => write!(f, "[{index}]"),
        }
    }
}

/// Renders a path as a single dotted/bracketed string, e.g. `a.b[2].c`.
#[must_use]
pub fn render_path(path: &[PathSegment]) -> String {
    let mut out = String::new();
    for (i, segment) in path.iter().enumerate() {
        match segment {
            PathSegment::Key(key) if i == 0 => out.push_str(key),
            _ => out.push_str(&segment.to_string()),
        }
    }
    out
}

/// The kind of change a [`DiffEntry`] represents.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum DiffOp {
    /// A value was removed. Applied first so later inserts don't collide
    /// with indices that are about to disappear.
    Delete,
    /// A scalar value changed in place.
    Update,
    /// An array/set element moved position without changing value.
    Move {
        /// The element's index before the move.
        from_index: usize,
        /// The element's index after the move.
        to_index: usize,
    },
    /// A new value was added.
    Create,
}

impl DiffOp {
    /// Apply priority: lower sorts first. Deletes must land before
    /// updates/creates so a subsequent insert at a freed index is
    /// unambiguous; creates land last so they never get shadowed by a
    /// move computed against the pre-create indices.
    const fn priority(&self) -> u8 {
        match self {
            Self::Delete => 0,
            Self::Update => 1,
            Self::Move { .. } => 2,
            Self::Create => 3,
        }
    }
}

/// A single structural change at a path.
#[derive(Debug, Clone, PartialEq)]
pub struct DiffEntry {
    /// Where in the tree this change applies.
    pub path: Vec<PathSegment>,
    /// What kind of change this is.
    pub op: DiffOp,
    /// The value before the change, when applicable (absent for `Create`).
    pub old_value: Option<CanonicalValue>,
    /// The value after the change, when applicable (absent for `Delete`).
    pub new_value: Option<CanonicalValue>,
}

/// A comparator overriding the default equality check for values of a
/// given kind, keyed in [`DiffOptions::custom_comparators`] by
/// [`CanonicalValue::kind_name`] (or `"*"` to match every kind).
pub type CustomComparator = fn(&CanonicalValue, &CanonicalValue) -> bool;

/// Options controlling how two trees are compared.
#[derive(Debug, Clone)]
pub struct DiffOptions {
    /// Object/map keys to ignore entirely when comparing.
    pub ignore_keys: Vec<String>,
    /// Whether array/set element reordering is reported as `Move` entries
    /// (`true`) or as paired `Delete`+`Create` entries (`false`). Arrays
    /// are positional (index-by-index) by default, matching how a
    /// structural diff must recurse into same-index elements rather than
    /// re-matching them by value.
    pub detect_moves: bool,
    /// Maximum recursion depth; deeper structures are silently truncated.
    pub max_depth: usize,
    /// Per-kind equality overrides, keyed by constructor name or `"*"`.
    pub custom_comparators: HashMap<String, CustomComparator>,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            ignore_keys: DEFAULT_IGNORE_KEYS.iter().map(|s| (*s).to_string()).collect(),
            detect_moves: false,
            max_depth: DEFAULT_MAX_DEPTH,
            custom_comparators: HashMap::new(),
        }
    }
}

/// Deep-compares two values for semantic equality using the default
/// [`DiffOptions`] (the same ignored-property set a diff uses).
///
/// `Object`/`Map` comparisons are key-order-insensitive; `Array`/`Set`
/// comparisons are position-sensitive. `Number` equality compares the
/// parsed `f64` value so that `1` and `1.0` compare equal.
#[must_use]
pub fn deep_equals(a: &CanonicalValue, b: &CanonicalValue) -> bool {
    deep_equals_opts(a, b, &DiffOptions::default())
}

/// Deep-compares two values for semantic equality, ignoring
/// `options.ignore_keys` at every object/map level, honoring
/// `options.custom_comparators`, and truncating (treating as equal) past
/// `options.max_depth` — the same rules [`generate_object_diff`] applies.
#[must_use]
pub fn deep_equals_opts(a: &CanonicalValue, b: &CanonicalValue, options: &DiffOptions) -> bool {
    deep_equals_at(a, b, options, 0)
}

fn resolve_comparator<'a>(
    options: &'a DiffOptions,
    kind: &str,
) -> Option<&'a CustomComparator> {
    options
        .custom_comparators
        .get(kind)
        .or_else(|| options.custom_comparators.get("*"))
}

fn deep_equals_at(a: &CanonicalValue, b: &CanonicalValue, options: &DiffOptions, depth: usize) -> bool {
    if let Some(comparator) = resolve_comparator(options, a.kind_name()) {
        return comparator(a, b);
    }
    if depth >= options.max_depth {
        return true;
    }
    match (a, b) {
        (CanonicalValue::Null, CanonicalValue::Null) => true,
        (CanonicalValue::Bool(x), CanonicalValue::Bool(y)) => x == y,
        (CanonicalValue::String(x), CanonicalValue::String(y)) => x == y,
        (CanonicalValue::Timestamp(x), CanonicalValue::Timestamp(y)) => x == y,
        (CanonicalValue::Number(x), CanonicalValue::Number(y)) => {
            (x.as_f64().unwrap_or(f64::NAN) - y.as_f64().unwrap_or(f64::NAN)).abs() < f64::EPSILON
        }
        (CanonicalValue::Array(x), CanonicalValue::Array(y))
        | (CanonicalValue::Set(x), CanonicalValue::Set(y)) => {
            x.len() == y.len()
                && x.iter()
                    .zip(y.iter())
                    .all(|(xi, yi)| deep_equals_at(xi, yi, options, depth + 1))
        }
        (CanonicalValue::Object(x), CanonicalValue::Object(y))
        | (CanonicalValue::Map(x), CanonicalValue::Map(y)) => {
            let is_ignored = |k: &&String| options.ignore_keys.iter().any(|ik| ik == *k);
            let xk: Vec<&String> = x.keys().filter(|k| !is_ignored(k)).collect();
            let yk: Vec<&String> = y.keys().filter(|k| !is_ignored(k)).collect();
            xk.len() == yk.len()
                && xk.iter().all(|k| {
                    yk.contains(k)
                        && match (x.get(*k), y.get(*k)) {
                            (Some(xv), Some(yv)) => deep_equals_at(xv, yv, options, depth + 1),
                            _ => false,
                        }
                })
        }
        _ => false,
    }
}

fn push_key(path: &[PathSegment], key: &str) -> Vec<PathSegment> {
    let mut next = path.to_vec();
    next.push(PathSegment::Key(key.to_string()));
    next
}

fn push_index(path: &[PathSegment], index: usize) -> Vec<PathSegment> {
    let mut next = path.to_vec();
    next.push(PathSegment::Index(index));
    next
}

#[allow(clippy::too_many_arguments)]
fn diff_maps(
    path: &[PathSegment],
    old: &indexmap::IndexMap<String, CanonicalValue>,
    new: &indexmap::IndexMap<String, CanonicalValue>,
    options: &DiffOptions,
    depth: usize,
    out: &mut Vec<DiffEntry>,
) {
    for (key, old_value) in old {
        if options.ignore_keys.iter().any(|k| k == key) {
            continue;
        }
        let key_path = push_key(path, key);
        match new.get(key) {
            None => out.push(DiffEntry {
                path: key_path,
                op: DiffOp::Delete,
                old_value: Some(old_value.clone()),
                new_value: None,
            }),
            Some(new_value) => diff_values(&key_path, old_value, new_value, options, depth + 1, out),
        }
    }
    for (key, new_value) in new {
        if options.ignore_keys.iter().any(|k| k == key) || old.contains_key(key) {
            continue;
        }
        out.push(DiffEntry {
            path: push_key(path, key),
            op: DiffOp::Create,
            old_value: None,
            new_value: Some(new_value.clone()),
        });
    }
}

fn diff_sequences(
    path: &[PathSegment],
    old: &[CanonicalValue],
    new: &[CanonicalValue],
    options: &DiffOptions,
    depth: usize,
    out: &mut Vec<DiffEntry>,
) {
    if options.detect_moves {
        diff_sequences_with_moves(path, old, new, options, depth, out);
        return;
    }
    let shared = old.len().min(new.len());
    for i in 0..shared {
        diff_values(&push_index(path, i), &old[i], &new[i], options, depth + 1, out);
    }
    for (i, value) in old.iter().enumerate().skip(shared) {
        out.push(DiffEntry {
            path: push_index(path, i),
            op: DiffOp::Delete,
            old_value: Some(value.clone()),
            new_value: None,
        });
    }
    for (i, value) in new.iter().enumerate().skip(shared) {
        out.push(DiffEntry {
            path: push_index(path, i),
            op: DiffOp::Create,
            old_value: None,
            new_value: Some(value.clone()),
        });
    }
}

/// Diffs two sequences with move detection: elements are matched by value
/// equality first (stable matching in encounter order), unmatched old
/// elements become deletes, unmatched new elements become creates, and
/// matched elements whose index changed become `Move` entries.
#[allow(clippy::too_many_arguments)]
fn diff_sequences_with_moves(
    path: &[PathSegment],
    old: &[CanonicalValue],
    new: &[CanonicalValue],
    options: &DiffOptions,
    depth: usize,
    out: &mut Vec<DiffEntry>,
) {
    let mut new_consumed = vec![false; new.len()];
    let mut old_match = vec![None; old.len()];

    for (old_index, old_value) in old.iter().enumerate() {
        for (new_index, consumed) in new_consumed.iter_mut().enumerate() {
            if *consumed {
                continue;
            }
            if deep_equals_opts(old_value, &new[new_index], options) {
                *consumed = true;
                old_match[old_index] = Some(new_index);
                break;
            }
        }
    }

    for (old_index, old_value) in old.iter().enumerate() {
        match old_match[old_index] {
            None => out.push(DiffEntry {
                path: push_index(path, old_index),
                op: DiffOp::Delete,
                old_value: Some(old_value.clone()),
                new_value: None,
            }),
            Some(new_index) if new_index != old_index => out.push(DiffEntry {
                path: push_index(path, old_index),
                op: DiffOp::Move {
                    from_index: old_index,
                    to_index: new_index,
                },
                old_value: Some(old_value.clone()),
                new_value: Some(new[new_index].clone()),
            }),
            Some(new_index) => {
                diff_values(
                    &push_index(path, new_index),
                    old_value,
                    &new[new_index],
                    options,
                    depth + 1,
                    out,
                );
            }
        }
    }

    for (new_index, value) in new.iter().enumerate() {
        if !new_consumed[new_index] {
            out.push(DiffEntry {
                path: push_index(path, new_index),
                op: DiffOp::Create,
                old_value: None,
                new_value: Some(value.clone()),
            });
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn diff_values(
    path: &[PathSegment],
    old: &CanonicalValue,
    new: &CanonicalValue,
    options: &DiffOptions,
    depth: usize,
    out: &mut Vec<DiffEntry>,
) {
    if depth >= options.max_depth {
        return;
    }
    if let Some(comparator) = resolve_comparator(options, old.kind_name()) {
        if !comparator(old, new) {
            out.push(DiffEntry {
                path: path.to_vec(),
                op: DiffOp::Update,
                old_value: Some(old.clone()),
                new_value: Some(new.clone()),
            });
        }
        return;
    }
    match (old, new) {
        (CanonicalValue::Object(o), CanonicalValue::Object(n))
        | (CanonicalValue::Map(o), CanonicalValue::Map(n)) => {
            diff_maps(path, o, n, options, depth, out);
        }
        (CanonicalValue::Array(o), CanonicalValue::Array(n))
        | (CanonicalValue::Set(o), CanonicalValue::Set(n)) => {
            diff_sequences(path, o, n, options, depth, out);
        }
        _ if old.kind_name() == new.kind_name() => {
            if !deep_equals_opts(old, new, options) {
                out.push(DiffEntry {
                    path: path.to_vec(),
                    op: DiffOp::Update,
                    old_value: Some(old.clone()),
                    new_value: Some(new.clone()),
                });
            }
        }
        _ => out.push(DiffEntry {
            path: path.to_vec(),
            op: DiffOp::Update,
            old_value: Some(old.clone()),
            new_value: Some(new.clone()),
        }),
    }
}

/// Computes the structural diff between two object trees.
///
/// Entries are returned in apply priority order
/// (delete → update → move → create) so [`apply_diff`] can apply them in
/// the order produced without a separate sort.
#[must_use]
pub fn generate_object_diff(
    old: &CanonicalValue,
    new: &CanonicalValue,
    options: &DiffOptions,
) -> Vec<DiffEntry> {
    let mut entries = Vec::new();
    diff_values(&[], old, new, options, 0, &mut entries);
    entries.sort_by_key(DiffEntry::priority_key);
    entries
}

impl DiffEntry {
    fn priority_key(&self) -> u8 {
        self.op.priority()
    }
}

/// Error returned when a [`DiffEntry`] cannot be applied to a tree.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ApplyError {
    /// The path addressed a key/index that does not exist in the target.
    #[error("path not found: {path}")]
    PathNotFound {
        /// The rendered path that could not be resolved.
        path: String,
    },
    /// The path traversed through a non-container value.
    #[error("path traverses a non-container value: {path}")]
    NotAContainer {
        /// The rendered path at which a scalar was encountered.
        path: String,
    },
}

fn navigate_mut<'a>(
    root: &'a mut CanonicalValue,
    path: &[PathSegment],
) -> Result<&'a mut CanonicalValue, ApplyError> {
    let mut current = root;
    for segment in path {
        current = match (segment, current) {
            (PathSegment::Key(key), CanonicalValue::Object(map))
            | (PathSegment::Key(key), CanonicalValue::Map(map)) => {
                map.get_mut(key).ok_or_else(|| ApplyError::PathNotFound {
                    path: key.clone(),
                })?
            }
            (PathSegment::Index(index), CanonicalValue::Array(items))
            | (PathSegment::Index(index), CanonicalValue::Set(items)) => {
                items.get_mut(*index).ok_or_else(|| ApplyError::PathNotFound {
                    path: index.to_string(),
                })?
            }
            (segment, _) => {
                return Err(ApplyError::NotAContainer {
                    path: segment.to_string(),
                })
            }
        };
    }
    Ok(current)
}

/// Applies a list of [`DiffEntry`] values to `root` in place.
///
/// Entries are applied in [`DiffOp`] priority order (delete → update →
/// move → create) regardless of the order they're passed in, matching
/// [`generate_object_diff`]'s output order.
///
/// # Errors
///
/// Returns [`ApplyError`] if an entry's path cannot be resolved against
/// `root` (e.g. applying a diff to a tree that has since changed shape).
pub fn apply_diff(root: &mut CanonicalValue, entries: &[DiffEntry]) -> Result<(), ApplyError> {
    let mut ordered: Vec<&DiffEntry> = entries.iter().collect();
    ordered.sort_by_key(|entry| entry.op.priority());

    for entry in ordered {
        apply_entry(root, entry)?;
    }
    Ok(())
}

fn apply_entry(root: &mut CanonicalValue, entry: &DiffEntry) -> Result<(), ApplyError> {
    let Some(last) = entry.path.last() else {
        if let Some(new_value) = &entry.new_value {
            *root = new_value.clone();
        }
        return Ok(());
    };

    let parent = navigate_mut(root, &entry_parent_path(entry))?;
    match (last, &entry.op, parent) {
        (PathSegment::Key(key), DiffOp::Delete, CanonicalValue::Object(map))
        | (PathSegment::Key(key), DiffOp::Delete, CanonicalValue::Map(map)) => {
            map.shift_remove(key);
        }
        (PathSegment::Key(key), _, CanonicalValue::Object(map))
        | (PathSegment::Key(key), _, CanonicalValue::Map(map)) => {
            if let Some(value) = &entry.new_value {
                map.insert(key.clone(), value.clone());
            }
        }
        (PathSegment::Index(index), DiffOp::Delete, CanonicalValue::Array(items))
        | (PathSegment::Index(index), DiffOp::Delete, CanonicalValue::Set(items)) => {
            if *index < items.len() {
                items.remove(*index);
            }
        }
        (PathSegment::Index(_), DiffOp::Move { to_index, .. }, CanonicalValue::Array(items))
        | (PathSegment::Index(_), DiffOp::Move { to_index, .. }, CanonicalValue::Set(items)) => {
            if let Some(value) = &entry.new_value {
                if *to_index <= items.len() {
                    items.insert((*to_index).min(items.len()), value.clone());
                }
            }
        }
        (PathSegment::Index(index), DiffOp::Create, CanonicalValue::Array(items))
        | (PathSegment::Index(index), DiffOp::Create, CanonicalValue::Set(items)) => {
            let at = (*index).min(items.len());
            if let Some(value) = &entry.new_value {
                items.insert(at, value.clone());
            }
        }
        (PathSegment::Index(index), DiffOp::Update, CanonicalValue::Array(items))
        | (PathSegment::Index(index), DiffOp::Update, CanonicalValue::Set(items)) => {
            if let (Some(value), Some(slot)) = (&entry.new_value, items.get_mut(*index)) {
                *slot = value.clone();
            }
        }
        _ => {
            return Err(ApplyError::NotAContainer {
                path: last.to_string(),
            })
        }
    }
    Ok(())
}

fn entry_parent_path(entry: &DiffEntry) -> Vec<PathSegment> {
    entry.path[..entry.path.len().saturating_sub(1)].to_vec()
}

/// A coarse classification of how large a diff is, based on its total
/// entry count: `Low` (≤20), `Medium` (≤100), `High` (>100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffComplexity {
    /// 20 or fewer entries.
    Low,
    /// Between 21 and 100 entries.
    Medium,
    /// More than 100 entries.
    High,
}

impl DiffComplexity {
    fn classify(total: usize) -> Self {
        if total <= 20 {
            Self::Low
        } else if total <= 100 {
            Self::Medium
        } else {
            Self::High
        }
    }
}

impl std::fmt::Display for DiffComplexity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
        }
    }
}

/// A summary of a diff, for logs and operator-facing output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffSummary {
    /// Number of `Create` entries.
    pub created: usize,
    /// Number of `Update` entries.
    pub updated: usize,
    /// Number of `Delete` entries.
    pub deleted: usize,
    /// Number of `Move` entries.
    pub moved: usize,
    /// Total entry count (`created + updated + deleted + moved`).
    pub total: usize,
    /// How large the diff is, classified from `total`.
    pub complexity: DiffComplexity,
    /// The root (first path segment) of every change, rendered as a raw
    /// key (e.g. `"name"`) or bracketed index (e.g. `"[0]"`). Order
    /// matches `entries`, duplicates included.
    pub root_paths: Vec<String>,
}

/// Summarizes a diff's op counts, complexity, and root paths.
#[must_use]
pub fn summarize_diff(entries: &[DiffEntry]) -> DiffSummary {
    let mut created = 0usize;
    let mut updated = 0usize;
    let mut deleted = 0usize;
    let mut moved = 0usize;
    let mut root_paths = Vec::with_capacity(entries.len());
    for entry in entries {
        match entry.op {
            DiffOp::Create => created += 1,
            DiffOp::Update => updated += 1,
            DiffOp::Delete => deleted += 1,
            DiffOp::Move { .. } => moved += 1,
        }
        root_paths.push(match entry.path.first() {
            Some(PathSegment::Key(key)) => key.clone(),
            Some(PathSegment::Index(index)) => format!("[{index}]"),
            None => String::new(),
        });
    }
    let total = entries.len();
    DiffSummary {
        created,
        updated,
        deleted,
        moved,
        total,
        complexity: DiffComplexity::classify(total),
        root_paths,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    fn object(pairs: impl IntoIterator<Item = (&'static str, CanonicalValue)>) -> CanonicalValue {
        CanonicalValue::Object(pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
    }

    fn s(value: &str) -> CanonicalValue {
        CanonicalValue::String(value.to_string())
    }

    #[test]
    fn detects_scalar_update() {
        let old = object([("name", s("alice"))]);
        let new = object([("name", s("bob"))]);
        let entries = generate_object_diff(&old, &new, &DiffOptions::default());
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].op, DiffOp::Update);
    }

    #[test]
    fn detects_created_and_deleted_keys() {
        let old = object([("a", s("1"))]);
        let new = object([("b", s("2"))]);
        let entries = generate_object_diff(&old, &new, &DiffOptions::default());
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().any(|e| e.op == DiffOp::Delete));
        assert!(entries.iter().any(|e| e.op == DiffOp::Create));
        // Delete must sort before create for safe sequential apply.
        assert_eq!(entries[0].op, DiffOp::Delete);
    }

    #[test]
    fn ignores_configured_keys() {
        let old = object([("a", s("1")), ("ignored", s("x"))]);
        let new = object([("a", s("2")), ("ignored", s("y"))]);
        let options = DiffOptions {
            ignore_keys: vec!["ignored".to_string()],
            ..DiffOptions::default()
        };
        let entries = generate_object_diff(&old, &new, &options);
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn detects_array_move() {
        let old = CanonicalValue::Array(vec![s("a"), s("b"), s("c")]);
        let new = CanonicalValue::Array(vec![s("c"), s("a"), s("b")]);
        let options = DiffOptions {
            detect_moves: true,
            ..DiffOptions::default()
        };
        let entries = generate_object_diff(&old, &new, &options);
        assert!(entries.iter().any(|e| matches!(e.op, DiffOp::Move { .. })));
    }

    #[test]
    fn array_diff_is_positional_by_default_and_recurses_into_elements() {
        let old = object([(
            "entities",
            CanonicalValue::Array(vec![object([("id", s("1")), ("name", s("A"))])]),
        )]);
        let new = object([(
            "entities",
            CanonicalValue::Array(vec![object([("id", s("1")), ("name", s("B"))])]),
        )]);
        let entries = generate_object_diff(&old, &new, &DiffOptions::default());
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].op, DiffOp::Update);
        assert_eq!(
            render_path(&entries[0].path),
            "entities[0].name"
        );
    }

    #[test]
    fn apply_diff_reproduces_new_tree_for_object_changes() {
        let old = object([("a", s("1")), ("b", s("2"))]);
        let new = object([("b", s("3")), ("c", s("4"))]);
        let entries = generate_object_diff(&old, &new, &DiffOptions::default());
        let mut tree = old;
        apply_diff(&mut tree, &entries).expect("apply should succeed");
        assert!(deep_equals(&tree, &new));
    }

    #[test]
    fn apply_diff_is_order_independent_due_to_priority_sort() {
        let old = object([("a", s("1")), ("b", s("2"))]);
        let new = object([("a", s("9"))]);
        let mut entries = generate_object_diff(&old, &new, &DiffOptions::default());
        entries.reverse();
        let mut tree = old;
        apply_diff(&mut tree, &entries).expect("apply should succeed regardless of input order");
        assert!(deep_equals(&tree, &new));
    }

    #[test]
    fn deep_equals_treats_map_and_object_as_different_kinds() {
        let map = CanonicalValue::Map(IndexMap::from([("k".to_string(), s("v"))]));
        let object = object([("k", s("v"))]);
        assert!(!deep_equals(&map, &object));
    }

    #[test]
    fn summarize_diff_counts_each_op_kind() {
        let old = object([("a", s("1")), ("b", s("2"))]);
        let new = object([("b", s("3")), ("c", s("4"))]);
        let entries = generate_object_diff(&old, &new, &DiffOptions::default());
        let summary = summarize_diff(&entries);
        assert_eq!(summary.created, 1);
        assert_eq!(summary.updated, 0);
        assert_eq!(summary.deleted, 1);
        assert_eq!(summary.moved, 0);
        assert_eq!(summary.total, 2);
        assert_eq!(summary.complexity, DiffComplexity::Low);
        assert_eq!(summary.root_paths, vec!["a".to_string(), "c".to_string()]);
    }

    #[test]
    fn summarize_diff_classifies_complexity_thresholds() {
        assert_eq!(DiffComplexity::classify(20), DiffComplexity::Low);
        assert_eq!(DiffComplexity::classify(21), DiffComplexity::Medium);
        assert_eq!(DiffComplexity::classify(100), DiffComplexity::Medium);
        assert_eq!(DiffComplexity::classify(101), DiffComplexity::High);
    }

    #[test]
    fn default_ignore_keys_exclude_dunder_metadata_properties() {
        let old = object([("__timestamp", s("t1")), ("__version", s("1")), ("a", s("1"))]);
        let new = object([("__timestamp", s("t2")), ("__version", s("2")), ("a", s("1"))]);
        assert!(deep_equals(&old, &new));
        assert!(generate_object_diff(&old, &new, &DiffOptions::default()).is_empty());
    }

    #[test]
    fn max_depth_truncates_deep_recursion() {
        let deep_old = object([("a", object([("b", object([("c", s("1"))]))]))]);
        let deep_new = object([("a", object([("b", object([("c", s("2"))]))]))]);
        let options = DiffOptions {
            max_depth: 1,
            ..DiffOptions::default()
        };
        assert!(generate_object_diff(&deep_old, &deep_new, &options).is_empty());
        assert!(deep_equals_opts(&deep_old, &deep_new, &options));
    }

    #[test]
    fn custom_comparator_overrides_default_equality() {
        fn always_equal(_: &CanonicalValue, _: &CanonicalValue) -> bool {
            true
        }
        let old = object([("a", s("1"))]);
        let new = object([("a", s("2"))]);
        let mut custom_comparators = HashMap::new();
        custom_comparators.insert("String".to_string(), always_equal as CustomComparator);
        let options = DiffOptions {
            custom_comparators,
            ..DiffOptions::default()
        };
        assert!(deep_equals_opts(&old, &new, &options));
        assert!(generate_object_diff(&old, &new, &options).is_empty());
    }
}
