//! Mask selection and the four penalty rules.

use super::matrix::QrMatrix;

/// Number of mask patterns.
pub const MASK_COUNT: u8 = 8;

const N2_BLOCK: u32 = 3;
const N3_FINDER_LIKE: u32 = 40;

/// Total penalty of a masked grid under all four rules.
pub fn evaluate_penalty(matrix: &QrMatrix) -> u32 {
    same_colour_runs(matrix) + same_colour_blocks(matrix) + finder_like_patterns(matrix)
        + dark_ratio(matrix)
}

/// Try every mask on a grid holding the placed codewords and keep the one
/// with the lowest penalty. Ties go to the lower mask number.
///
/// Scoring stops as soon as a candidate can no longer beat the best so far,
/// so the returned score is always the full penalty of the winner.
pub fn select_mask(placed: &QrMatrix) -> (QrMatrix, u8, u32) {
    let first = placed.masked(0);
    let first_score = evaluate_penalty(&first);
    log::trace!("Mask 0 scores {}", first_score);
    let mut best = (first, 0, first_score);

    let rules: [fn(&QrMatrix) -> u32; 4] = [
        same_colour_runs,
        same_colour_blocks,
        finder_like_patterns,
        dark_ratio,
    ];
    'masks: for mask in 1..MASK_COUNT {
        let candidate = placed.masked(mask);
        let mut score = 0;
        for rule in rules {
            score += rule(&candidate);
            if score >= best.2 {
                continue 'masks;
            }
        }
        log::trace!("Mask {} scores {}", mask, score);
        best = (candidate, mask, score);
    }
    best
}

/// Rule 1: runs of five or more same coloured modules in a row or column
/// score the run length minus two.
fn same_colour_runs(matrix: &QrMatrix) -> u32 {
    let dim = matrix.dim();
    let mut score = 0;
    for transpose in [false, true] {
        for line in 0..dim {
            let dark = |i: usize| {
                if transpose {
                    matrix.is_dark(i, line)
                } else {
                    matrix.is_dark(line, i)
                }
            };
            let mut count = 1;
            for i in 1..dim {
                if dark(i - 1) != dark(i) {
                    if count >= 5 {
                        score += count - 2;
                    }
                    count = 0;
                }
                count += 1;
            }
            if count >= 5 {
                score += count - 2;
            }
        }
    }
    score
}

/// Rule 2: every 2x2 block of one colour scores 3. Blocks overlap.
fn same_colour_blocks(matrix: &QrMatrix) -> u32 {
    let dim = matrix.dim();
    let mut score = 0;
    for row in 1..dim {
        for col in 1..dim {
            let colour = matrix.is_dark(row, col);
            if matrix.is_dark(row - 1, col - 1) == colour
                && matrix.is_dark(row - 1, col) == colour
                && matrix.is_dark(row, col - 1) == colour
            {
                score += N2_BLOCK;
            }
        }
    }
    score
}

/// Rule 3: a dark-light-dark-dark-dark-light-dark pattern next to a light
/// run of at least four modules scores 40, in rows and columns.
fn finder_like_patterns(matrix: &QrMatrix) -> u32 {
    let dim = matrix.dim();
    let mut score = 0;
    for transpose in [false, true] {
        for line in 0..dim {
            let dark = |i: usize| {
                if transpose {
                    matrix.is_dark(i, line)
                } else {
                    matrix.is_dark(line, i)
                }
            };
            let pattern_at = |i: usize| {
                dark(i)
                    && !dark(i + 1)
                    && dark(i + 2)
                    && dark(i + 3)
                    && dark(i + 4)
                    && !dark(i + 5)
                    && dark(i + 6)
            };

            // start of the current light run
            let mut start = 0;
            let mut i = 0;
            while i < dim {
                if !dark(i) {
                    i += 1;
                    continue;
                }
                if i - start >= 4 {
                    if start >= 7 && pattern_at(start - 7) {
                        score += N3_FINDER_LIKE;
                    }
                    if dim - i >= 7 && pattern_at(i) {
                        score += N3_FINDER_LIKE;
                        i += 6;
                    }
                }
                start = i + 1;
                i += 1;
            }
            if dim - start >= 4 && start >= 7 && pattern_at(start - 7) {
                score += N3_FINDER_LIKE;
            }
        }
    }
    score
}

/// Rule 4: 10 points for every full 5% the dark share strays beyond
/// 45%..55% from one half.
fn dark_ratio(matrix: &QrMatrix) -> u32 {
    let total = (matrix.dim() * matrix.dim()) as f64;
    let ratio = matrix.dark_count() as f64 / total;
    if ratio > 0.55 {
        (20.0 * (ratio - 0.5)) as u32 * 10
    } else if ratio < 0.45 {
        (20.0 * (0.5 - ratio)) as u32 * 10
    } else {
        0
    }
}
