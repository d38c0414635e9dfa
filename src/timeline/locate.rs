use crate::overlay::model::OverlayFrame;

/// Smallest span used as an interpolation denominator.
pub const MIN_SPAN: f64 = 1e-6;

/// The frames surrounding a query and the blend weight between them.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bracket {
    pub floor: usize,
    /// `None` at or beyond the final frame.
    pub next: Option<usize>,
    /// Position of the query between `floor` and `next`, in `[0, 1]`.
    pub alpha: f64,
}

/// Index of the last frame whose key is `<= query`.
///
/// Queries before the first frame clamp to 0, queries past the end return the last index.
/// `frames` must be sorted by key. Returns 0 for an empty slice.
pub fn locate_floor(frames: &[OverlayFrame], query: f64) -> usize {
    let after = frames.partition_point(|f| f.key <= query);
    after.saturating_sub(1)
}

/// Floor frame, next frame and blend weight for `query`.
///
/// Among frames sharing a key the last one is used on both ends of the blend.
pub fn bracket(frames: &[OverlayFrame], query: f64) -> Option<Bracket> {
    if frames.is_empty() {
        return None;
    }
    let mut floor = locate_floor(frames, query);
    if query < frames[floor].key {
        let first = frames[floor].key;
        floor = frames.partition_point(|f| f.key <= first) - 1;
    }
    let Some(following) = frames.get(floor + 1) else {
        return Some(Bracket {
            floor,
            next: None,
            alpha: 0.0,
        });
    };
    let kb = following.key;
    let next = frames.partition_point(|f| f.key <= kb) - 1;

    let ka = frames[floor].key;
    let span = (kb - ka).max(MIN_SPAN);
    let alpha = ((query - ka) / span).clamp(0.0, 1.0);
    Some(Bracket {
        floor,
        next: Some(next),
        alpha: if alpha.is_nan() { 0.0 } else { alpha },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frames(keys: &[f64]) -> Vec<OverlayFrame> {
        keys.iter()
            .map(|&key| OverlayFrame {
                key,
                ..OverlayFrame::default()
            })
            .collect()
    }

    #[test]
    fn floor_lookup_and_clamping() {
        let f = frames(&[0.0, 0.5, 1.0, 2.0]);
        assert_eq!(locate_floor(&f, -1.0), 0);
        assert_eq!(locate_floor(&f, 0.0), 0);
        assert_eq!(locate_floor(&f, 0.49), 0);
        assert_eq!(locate_floor(&f, 0.5), 1);
        assert_eq!(locate_floor(&f, 1.7), 2);
        assert_eq!(locate_floor(&f, 99.0), 3);
        assert_eq!(locate_floor(&[], 1.0), 0);
    }

    #[test]
    fn duplicate_keys_resolve_to_last_duplicate() {
        let f = frames(&[0.0, 1.0, 1.0, 1.0, 2.0]);
        assert_eq!(locate_floor(&f, 1.0), 3);
        assert_eq!(locate_floor(&f, 1.5), 3);
    }

    #[test]
    fn next_frame_is_last_of_its_duplicate_run() {
        let f = frames(&[0.0, 1.0, 1.0, 1.0, 2.0]);
        let b = bracket(&f, 0.5).unwrap();
        assert_eq!((b.floor, b.next), (0, Some(3)));
        assert!((b.alpha - 0.5).abs() < 1e-12);

        let b = bracket(&f, 1.25).unwrap();
        assert_eq!((b.floor, b.next), (3, Some(4)));

        let leading = frames(&[1.0, 1.0, 2.0]);
        let b = bracket(&leading, 0.5).unwrap();
        assert_eq!((b.floor, b.next, b.alpha), (1, Some(2), 0.0));
    }

    #[test]
    fn floor_is_monotone_in_query() {
        let f = frames(&[0.0, 0.1, 0.1, 0.4, 0.9, 1.3, 1.3, 2.0]);
        let mut last = 0;
        let mut q = -0.5;
        while q < 3.0 {
            let i = locate_floor(&f, q);
            assert!(i >= last, "floor moved backwards at q={q}");
            last = i;
            q += 0.013;
        }
        assert_eq!(last, f.len() - 1);
    }

    #[test]
    fn bracket_alpha() {
        let f = frames(&[0.0, 1.0, 3.0]);
        let b = bracket(&f, 2.0).unwrap();
        assert_eq!(b.floor, 1);
        assert_eq!(b.next, Some(2));
        assert!((b.alpha - 0.5).abs() < 1e-12);

        let before = bracket(&f, -5.0).unwrap();
        assert_eq!((before.floor, before.alpha), (0, 0.0));

        let end = bracket(&f, 3.0).unwrap();
        assert_eq!(end.next, None);
        assert_eq!(end.floor, 2);

        assert!(bracket(&[], 0.0).is_none());
    }

    #[test]
    fn single_frame_never_blends() {
        let f = frames(&[0.5]);
        let b = bracket(&f, 0.0).unwrap();
        assert_eq!((b.floor, b.next, b.alpha), (0, None, 0.0));
    }
}
