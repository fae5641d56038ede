//! Annotated-frame drawing.
//!
//! Draws hand regions, landmarks, stable tool markers and the status bar
//! onto a frame before it is encoded and published.

use crate::hand_localizer::HandRegion;
use crate::tracker::Track;
use crate::utils::safe_cast::f64_to_i32_clamp;
use crate::Result;
use opencv::core::{Mat, Point, Rect, Scalar, Vector};
use opencv::imgproc::{self, FONT_HERSHEY_SIMPLEX, LINE_8};
use opencv::prelude::*;

/// Height of the status bar strip, in pixels
const STATUS_BAR_HEIGHT: i32 = 100;

fn confidence_color(confidence: f64) -> Scalar {
    if confidence >= 0.9 {
        Scalar::new(0.0, 255.0, 0.0, 0.0) // Green
    } else if confidence >= 0.7 {
        Scalar::new(0.0, 255.0, 255.0, 0.0) // Yellow
    } else {
        Scalar::new(0.0, 165.0, 255.0, 0.0) // Orange
    }
}

fn fps_color(fps: f64) -> Scalar {
    if fps >= 20.0 {
        Scalar::new(0.0, 255.0, 0.0, 0.0)
    } else if fps >= 10.0 {
        Scalar::new(0.0, 165.0, 255.0, 0.0)
    } else {
        Scalar::new(0.0, 0.0, 255.0, 0.0)
    }
}

/// Draw all annotations for one cycle
pub fn annotate(frame: &mut Mat, regions: &[HandRegion], tools: &[&Track], fps: f64) -> Result<()> {
    for region in regions {
        draw_hand_region(frame, region)?;
    }
    for tool in tools {
        draw_stable_tool(frame, tool)?;
    }
    draw_status_bar(frame, fps, regions.len(), tools.len())?;
    Ok(())
}

/// Hand bounding box and landmark dots
fn draw_hand_region(frame: &mut Mat, region: &HandRegion) -> Result<()> {
    imgproc::rectangle(
        frame,
        region.bbox,
        Scalar::new(255.0, 0.0, 255.0, 0.0),
        2,
        LINE_8,
        0,
    )?;

    for landmark in &region.landmarks {
        let point = Point::new(landmark.x.round() as i32, landmark.y.round() as i32);
        imgproc::circle(frame, point, 2, Scalar::new(0.0, 255.0, 0.0, 0.0), -1, LINE_8, 0)?;
    }

    Ok(())
}

/// Smoothed-center marker, corner polygon and caption for one stable tool
fn draw_stable_tool(frame: &mut Mat, track: &Track) -> Result<()> {
    let center = track.display_center();
    let confidence = track.confidence();
    let color = confidence_color(confidence);

    imgproc::circle(frame, center, 10, color, -1, LINE_8, 0)?;
    imgproc::circle(frame, center, 15, color, 2, LINE_8, 0)?;

    // The corner polygon reflects an actual sighting, so it is only drawn
    // on cycles where the marker was seen
    if track.frames_lost == 0 {
        let mut polygon: Vector<Point> = Vector::new();
        for corner in &track.last_corners {
            polygon.push(Point::new(corner.x.round() as i32, corner.y.round() as i32));
        }
        let mut polygons: Vector<Vector<Point>> = Vector::new();
        polygons.push(polygon);
        imgproc::polylines(frame, &polygons, true, color, 3, LINE_8, 0)?;
    }

    let percent = f64_to_i32_clamp(confidence * 100.0, 0, 100);
    let label = track.label.as_str();
    let status = match track.frames_lost {
        0 => format!("Detected ({percent}%)"),
        _ => format!("Tracking ({percent}%)"),
    };

    let mut baseline = 0;
    let label_size = imgproc::get_text_size(label, FONT_HERSHEY_SIMPLEX, 0.7, 2, &mut baseline)?;
    let status_size = imgproc::get_text_size(&status, FONT_HERSHEY_SIMPLEX, 0.5, 1, &mut baseline)?;

    let caption_width = label_size.width.max(status_size.width);
    let top = center.y - label_size.height - status_size.height - 30;
    imgproc::rectangle(
        frame,
        Rect::new(center.x - 5, top, caption_width + 15, center.y - 10 - top),
        color,
        -1,
        LINE_8,
        0,
    )?;
    imgproc::put_text(
        frame,
        label,
        Point::new(center.x, center.y - status_size.height - 15),
        FONT_HERSHEY_SIMPLEX,
        0.7,
        Scalar::new(0.0, 0.0, 0.0, 0.0),
        2,
        LINE_8,
        false,
    )?;
    imgproc::put_text(
        frame,
        &status,
        Point::new(center.x, center.y - 15),
        FONT_HERSHEY_SIMPLEX,
        0.5,
        Scalar::new(0.0, 0.0, 0.0, 0.0),
        1,
        LINE_8,
        false,
    )?;

    Ok(())
}

/// Status strip across the top of the frame
fn draw_status_bar(frame: &mut Mat, fps: f64, hand_count: usize, tool_count: usize) -> Result<()> {
    let width = frame.cols();

    imgproc::rectangle(
        frame,
        Rect::new(0, 0, width, STATUS_BAR_HEIGHT),
        Scalar::new(0.0, 0.0, 0.0, 0.0),
        -1,
        LINE_8,
        0,
    )?;
    imgproc::rectangle(
        frame,
        Rect::new(0, 0, width, STATUS_BAR_HEIGHT),
        Scalar::new(255.0, 255.0, 255.0, 0.0),
        2,
        LINE_8,
        0,
    )?;

    imgproc::put_text(
        frame,
        &format!("FPS: {fps:.1}"),
        Point::new(width - 150, 30),
        FONT_HERSHEY_SIMPLEX,
        0.6,
        fps_color(fps),
        2,
        LINE_8,
        false,
    )?;

    let hands_color = if hand_count > 0 {
        Scalar::new(0.0, 255.0, 0.0, 0.0)
    } else {
        Scalar::new(0.0, 0.0, 255.0, 0.0)
    };
    imgproc::put_text(
        frame,
        &format!("Hands: {hand_count}"),
        Point::new(10, 30),
        FONT_HERSHEY_SIMPLEX,
        0.7,
        hands_color,
        2,
        LINE_8,
        false,
    )?;

    let tools_color = if tool_count > 0 {
        Scalar::new(0.0, 255.0, 0.0, 0.0)
    } else {
        Scalar::new(200.0, 200.0, 200.0, 0.0)
    };
    imgproc::put_text(
        frame,
        &format!("Stable Tools: {tool_count}"),
        Point::new(10, 65),
        FONT_HERSHEY_SIMPLEX,
        0.7,
        tools_color,
        2,
        LINE_8,
        false,
    )?;

    Ok(())
}
