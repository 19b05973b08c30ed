//! Change-region extraction from a dissimilarity map.

use std::collections::VecDeque;

use image::GrayImage;

use crate::types::ChangeRegion;

/// Variance-maximizing bi-level threshold over the map's intensity histogram.
///
/// Ties keep the first maximum, so the threshold is deterministic for a given
/// map. A constant map yields threshold 0 and therefore an empty foreground.
pub fn otsu_threshold(map: &GrayImage) -> u8 {
    let mut hist = [0u64; 256];
    for p in map.pixels() {
        hist[p.0[0] as usize] += 1;
    }

    let total = u64::from(map.width()) * u64::from(map.height());
    if total == 0 {
        return 0;
    }

    let sum_all: f64 = hist
        .iter()
        .enumerate()
        .map(|(i, &c)| i as f64 * c as f64)
        .sum();

    let mut sum_b = 0.0;
    let mut weight_b = 0u64;
    let mut best_threshold = 0u8;
    let mut best_variance = 0.0f64;

    for t in 0..256usize {
        weight_b += hist[t];
        if weight_b == 0 {
            continue;
        }
        let weight_f = total - weight_b;
        if weight_f == 0 {
            break;
        }
        sum_b += t as f64 * hist[t] as f64;

        let mean_b = sum_b / weight_b as f64;
        let mean_f = (sum_all - sum_b) / weight_f as f64;
        let between =
            weight_b as f64 * weight_f as f64 * (mean_b - mean_f) * (mean_b - mean_f);
        if between > best_variance {
            best_variance = between;
            best_threshold = t as u8;
        }
    }

    best_threshold
}

/// Extract connected change regions from a dissimilarity map.
///
/// The map is binarized at the Otsu threshold (foreground = strictly above),
/// then maximal 8-connected components are collected in row-major scan order.
/// Components whose pixel count is not strictly greater than `min_area` are
/// discarded. Output order is first-encountered scan order.
pub fn extract_change_regions(map: &GrayImage, min_area: u32) -> Vec<ChangeRegion> {
    let threshold = otsu_threshold(map);
    let (w, h) = map.dimensions();
    let mut visited = vec![false; (w as usize) * (h as usize)];
    let mut regions = Vec::new();

    for y in 0..h {
        for x in 0..w {
            let idx = (y * w + x) as usize;
            if visited[idx] || map.get_pixel(x, y).0[0] <= threshold {
                continue;
            }

            if let Some(region) = grow_component(map, threshold, &mut visited, x, y, min_area) {
                regions.push(region);
            }
        }
    }

    tracing::debug!(
        "extracted {} regions above {min_area} px (threshold {threshold})",
        regions.len()
    );
    regions
}

/// BFS flood fill over the 8-neighborhood, accumulating the bounding box and
/// pixel count. Returns `None` when the component fails the area filter.
fn grow_component(
    map: &GrayImage,
    threshold: u8,
    visited: &mut [bool],
    start_x: u32,
    start_y: u32,
    min_area: u32,
) -> Option<ChangeRegion> {
    let (w, h) = map.dimensions();
    let mut queue = VecDeque::new();
    queue.push_back((start_x, start_y));
    visited[(start_y * w + start_x) as usize] = true;

    let mut min_x = start_x;
    let mut max_x = start_x;
    let mut min_y = start_y;
    let mut max_y = start_y;
    let mut area = 0u32;

    while let Some((x, y)) = queue.pop_front() {
        area += 1;
        min_x = min_x.min(x);
        max_x = max_x.max(x);
        min_y = min_y.min(y);
        max_y = max_y.max(y);

        for dy in -1i64..=1 {
            for dx in -1i64..=1 {
                if dx == 0 && dy == 0 {
                    continue;
                }
                let nx = x as i64 + dx;
                let ny = y as i64 + dy;
                if nx < 0 || ny < 0 || nx >= i64::from(w) || ny >= i64::from(h) {
                    continue;
                }
                let (nx, ny) = (nx as u32, ny as u32);
                let nidx = (ny * w + nx) as usize;
                if !visited[nidx] && map.get_pixel(nx, ny).0[0] > threshold {
                    visited[nidx] = true;
                    queue.push_back((nx, ny));
                }
            }
        }
    }

    if area > min_area {
        Some(ChangeRegion {
            x: min_x,
            y: min_y,
            width: max_x - min_x + 1,
            height: max_y - min_y + 1,
            area,
        })
    } else {
        None
    }
}
