//! Choosing the primary raster of a page.

use image::GenericImageView;

/// Return the image with the largest pixel area.
///
/// Ties keep the first image in iteration order. `None` only for an empty
/// input; callers report that case themselves before selecting.
pub fn largest_image<I: GenericImageView>(images: impl IntoIterator<Item = I>) -> Option<I> {
    images
        .into_iter()
        .fold(None, |best: Option<(u64, I)>, image| {
            let area = pixel_area(&image);
            match best {
                Some((best_area, _)) if best_area >= area => best,
                _ => Some((area, image)),
            }
        })
        .map(|(_, image)| image)
}

fn pixel_area<I: GenericImageView>(image: &I) -> u64 {
    let (width, height) = image.dimensions();
    width as u64 * height as u64
}
