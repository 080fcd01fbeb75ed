//! In-memory page sort.

/// Slices of this length or shorter are finished with insertion sort.
const INSERTION_THRESHOLD: usize = 16;

/// Sorts integers in non-decreasing order in place.
///
/// Unstable partition-exchange sort driven by an explicit stack instead of recursion.
/// The smaller partition is always processed first and the larger one deferred, so the stack
/// never holds more than log2(n) ranges.
pub fn sort(items: &mut [i32]) {
    let mut pending: Vec<(usize, usize)> = Vec::new();
    let (mut lo, mut hi) = (0, items.len());

    loop {
        while hi - lo > INSERTION_THRESHOLD {
            let pivot = lo + partition(&mut items[lo..hi]);

            if pivot - lo < hi - pivot - 1 {
                pending.push((pivot + 1, hi));
                hi = pivot;
            } else {
                pending.push((lo, pivot));
                lo = pivot + 1;
            }
        }
        insertion_sort(&mut items[lo..hi]);

        match pending.pop() {
            Some((next_lo, next_hi)) => {
                lo = next_lo;
                hi = next_hi;
            }
            None => break,
        }
    }
}

/// Lomuto partition around the median of the first, middle and last items.
/// Returns the final pivot position. The slice must hold at least three items.
fn partition(items: &mut [i32]) -> usize {
    let last = items.len() - 1;
    let mid = last / 2;

    // items[0] <= items[last] <= items[mid]
    if items[mid] < items[0] {
        items.swap(mid, 0);
    }
    if items[last] < items[0] {
        items.swap(last, 0);
    }
    if items[mid] < items[last] {
        items.swap(mid, last);
    }

    let pivot = items[last];
    let mut store = 0;
    for idx in 0..last {
        if items[idx] < pivot {
            items.swap(store, idx);
            store += 1;
        }
    }
    items.swap(store, last);

    return store;
}

fn insertion_sort(items: &mut [i32]) {
    for idx in 1..items.len() {
        let item = items[idx];
        let mut pos = idx;
        while pos > 0 && items[pos - 1] > item {
            items[pos] = items[pos - 1];
            pos -= 1;
        }
        items[pos] = item;
    }
}

#[cfg(test)]
mod test {
    use rand::Rng;
    use rstest::*;

    use super::sort;

    #[rstest]
    #[case(vec![], vec![])]
    #[case(vec![1], vec![1])]
    #[case(vec![2, 1], vec![1, 2])]
    #[case(vec![9, 1, 8, 2, 7, 3, 6, 4, 5, 0], vec![0, 1, 2, 3, 4, 5, 6, 7, 8, 9])]
    #[case(vec![3, i32::MAX, -3, i32::MIN, 0], vec![i32::MIN, -3, 0, 3, i32::MAX])]
    fn test_sort(#[case] mut items: Vec<i32>, #[case] expected: Vec<i32>) {
        sort(&mut items);
        assert_eq!(items, expected);
    }

    #[rstest]
    #[case::ascending(Vec::from_iter(0..1000))]
    #[case::descending(Vec::from_iter((0..1000).rev()))]
    #[case::duplicates(Vec::from_iter((0..1000).map(|x| x % 7)))]
    #[case::constant(vec![5; 200])]
    #[case::organ_pipe(Vec::from_iter((0..500).chain((0..500).rev())))]
    fn test_sort_patterns(#[case] mut items: Vec<i32>) {
        let mut expected = items.clone();
        expected.sort();

        sort(&mut items);
        assert_eq!(items, expected);
    }

    #[rstest]
    fn test_sort_random() {
        let mut rng = rand::thread_rng();
        for len in [17, 100, 1024, 5000] {
            let mut items = Vec::from_iter((0..len).map(|_| rng.gen::<i32>()));
            let mut expected = items.clone();
            expected.sort();

            sort(&mut items);
            assert_eq!(items, expected);
        }
    }
}
