//! Cross-module tests: round trips, coverage, partition independence.

use half::bf16;

use super::dense::{is_zero_block, BlockShape, DenseView};
use super::formats::{to_bsc, to_bsr, BsrMatrix};
use super::partition::reorder_to_tile_chunks;
use super::tile::{real_count, tile, to_tile_groups, untile, TILE_BLOCK_SHAPE};

/// Deterministic sparse test matrix: roughly `density` of 16x1 strips nonzero.
fn sparse_i8(rows: usize, cols: usize, density: u32, seed: u64) -> Vec<i8> {
    let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
    let mut next = move || {
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        (state >> 33) as u32
    };
    let mut data = vec![0i8; rows * cols];
    for strip in 0..rows / 16 {
        for c in 0..cols {
            if next() % 100 < density {
                // one or two nonzero elements somewhere in the strip
                let r = strip * 16 + (next() % 16) as usize;
                data[r * cols + c] = (next() % 127) as i8 + 1;
                if next() % 2 == 0 {
                    let r2 = strip * 16 + (next() % 16) as usize;
                    data[r2 * cols + c] = -((next() % 127) as i8) - 1;
                }
            }
        }
    }
    data
}

fn sparse_bf16(rows: usize, cols: usize, density: u32, seed: u64) -> Vec<bf16> {
    sparse_i8(rows, cols, density, seed)
        .into_iter()
        .map(|v| bf16::from_f32(v as f32 * 0.25))
        .collect()
}

// ========================================================================
// Encoder properties
// ========================================================================

#[test]
fn test_bsr_round_trip_various_blocks() {
    let data = sparse_i8(64, 48, 20, 1);
    let view = DenseView::new(&data, (64, 48)).unwrap();
    for block in [(1, 1), (2, 2), (4, 3), (16, 1), (8, 16)] {
        let bsr = to_bsr(view, BlockShape::from(block)).unwrap();
        assert_eq!(bsr.to_dense(), data, "round trip failed for block {:?}", block);
    }
}

#[test]
fn test_bsc_round_trip_f32() {
    let data: Vec<f32> = sparse_i8(32, 32, 30, 2).into_iter().map(f32::from).collect();
    let view = DenseView::new(&data, (32, 32)).unwrap();
    let bsc = to_bsc(view, BlockShape::new(4, 4)).unwrap();
    assert_eq!(bsc.to_dense(), data);
}

#[test]
fn test_nonzero_block_completeness() {
    let data = sparse_i8(48, 40, 25, 3);
    let view = DenseView::new(&data, (48, 40)).unwrap();
    let block = BlockShape::new(4, 2);
    let bsr = to_bsr(view, block).unwrap();

    let stored: std::collections::HashSet<(usize, usize)> =
        bsr.iter_blocks().map(|(r, c, _)| (r, c)).collect();
    assert_eq!(stored.len(), bsr.nnz_blocks(), "a block was stored twice");

    for br in 0..bsr.block_rows() {
        for bc in 0..bsr.block_cols() {
            let offset = br * block.rows * 40 + bc * block.cols;
            let zero = is_zero_block(&data[offset..], 40, block);
            assert_eq!(stored.contains(&(br, bc)), !zero, "block ({}, {})", br, bc);
        }
    }
}

#[test]
fn test_pointer_monotonicity() {
    let data = sparse_i8(64, 64, 10, 4);
    let view = DenseView::new(&data, (64, 64)).unwrap();

    let bsr = to_bsr(view, BlockShape::new(16, 1)).unwrap();
    assert!(bsr.row_ptr().windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(*bsr.row_ptr().last().unwrap(), bsr.col_indices().len());

    let bsc = to_bsc(view, BlockShape::new(16, 1)).unwrap();
    assert!(bsc.col_ptr().windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(*bsc.col_ptr().last().unwrap(), bsc.row_indices().len());
}

// ========================================================================
// Tile grouping properties
// ========================================================================

#[test]
fn test_group_padding_invariant() {
    let data = sparse_i8(64, 200, 35, 5);
    let view = DenseView::new(&data, (64, 200)).unwrap();
    let bsr = to_bsr(view, TILE_BLOCK_SHAPE).unwrap();
    let tiled = to_tile_groups(bsr.clone(), 64).unwrap();

    for br in 0..tiled.block_rows() {
        let groups = tiled.block_row_range(br);
        let slots = &tiled.col_indices()[groups.start * 64..groups.end * 64];
        assert_eq!(slots.len() % 64, 0);

        let mut genuine = Vec::new();
        for chunk in slots.chunks_exact(64) {
            let real = real_count(chunk);
            assert!(chunk[..real].windows(2).all(|w| w[0] < w[1]));
            assert!(chunk[real..].iter().all(|&c| c == chunk[real - 1]));
            genuine.extend_from_slice(&chunk[..real]);
        }
        let original = &bsr.col_indices()[bsr.block_row_range(br)];
        assert_eq!(genuine, original);
    }
    assert_eq!(tiled.real_blocks(), bsr.nnz_blocks());
}

#[test]
fn test_tiled_round_trip_bf16() {
    let data = sparse_bf16(32, 96, 40, 6);
    let view = DenseView::new(&data, (32, 96)).unwrap();
    let bsr = to_bsr(view, TILE_BLOCK_SHAPE).unwrap();
    let tiled = to_tile_groups(bsr, 32).unwrap();
    assert_eq!(tiled.to_dense(), data);
}

#[test]
fn test_tile_reorder_is_bijection() {
    let data = sparse_i8(16, 256, 90, 7);
    let view = DenseView::new(&data, (16, 256)).unwrap();
    let bsr = to_bsr(view, TILE_BLOCK_SHAPE).unwrap();
    let tiled = to_tile_groups(bsr, 64).unwrap();

    let slots = tiled.nnz_blocks();
    let staged = untile(tiled.data(), slots, 64, TILE_BLOCK_SHAPE);
    assert_eq!(tile(&staged, slots, 64, TILE_BLOCK_SHAPE), tiled.data());

    let mut before: Vec<i8> = staged.clone();
    let mut after: Vec<i8> = tiled.data().to_vec();
    before.sort_unstable();
    after.sort_unstable();
    assert_eq!(before, after);
}

#[test]
fn test_concrete_grouping_case() {
    // one 16-row block-row with genuine columns 2, 5, 9 and group 4 would pad
    // to [2, 5, 9, 9]; with i8 the group is 64 so padding repeats 9 sixty-one times
    let mut data = vec![0i8; 16 * 12];
    for r in 0..16 {
        for c in [2, 5, 9] {
            data[r * 12 + c] = (r + c) as i8 + 1;
        }
    }
    let view = DenseView::new(&data, (16, 12)).unwrap();
    let tiled = to_tile_groups(to_bsr(view, TILE_BLOCK_SHAPE).unwrap(), 64).unwrap();

    assert_eq!(&tiled.col_indices()[..4], &[2, 5, 9, 9]);
    assert_eq!(real_count(tiled.col_indices()), 3);
    // tile row 0 holds row 0 of each genuine block, then padding zeros
    assert_eq!(&tiled.data()[..4], &[3, 6, 10, 0]);
}

// ========================================================================
// Partition properties
// ========================================================================

#[test]
fn test_partition_independence() {
    let (rows, cols, micro_rows) = (128, 72, 32);
    let data = sparse_i8(rows, cols, 15, 8);
    let view = DenseView::new(&data, (rows, cols)).unwrap();

    let whole = to_bsr(view, TILE_BLOCK_SHAPE).unwrap();
    let whole_blocks: Vec<(usize, usize)> = whole.iter_blocks().map(|(r, c, _)| (r, c)).collect();

    let chunks = reorder_to_tile_chunks(view, micro_rows, 64).unwrap();
    let per_chunk_rows = micro_rows / TILE_BLOCK_SHAPE.rows;
    let mut chunked_blocks = Vec::new();
    for (i, chunk) in chunks.iter().enumerate() {
        for br in 0..chunk.block_rows() {
            for group_idx in chunk.block_row_range(br) {
                let slots = &chunk.col_indices()[group_idx * 64..(group_idx + 1) * 64];
                for &c in &slots[..real_count(slots)] {
                    chunked_blocks.push((i * per_chunk_rows + br, c));
                }
            }
        }
    }

    assert_eq!(chunked_blocks, whole_blocks);
    assert_eq!(chunks.to_dense(), data);
}

#[test]
fn test_partition_matches_single_chunk_encoding() {
    let data = sparse_bf16(64, 40, 30, 9);
    let view = DenseView::new(&data, (64, 40)).unwrap();
    let chunks = reorder_to_tile_chunks(view, 16, 32).unwrap();

    for (i, chunk) in chunks.iter().enumerate() {
        let sub = view.row_chunk(i * 16, 16);
        let expected: BsrMatrix<bf16> = to_tile_groups(to_bsr(sub, TILE_BLOCK_SHAPE).unwrap(), 32).unwrap();
        assert_eq!(chunk, &expected);
    }
}
