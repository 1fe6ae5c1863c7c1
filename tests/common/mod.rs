#![allow(dead_code)]

use qr_checkin::Frame;
use qrcode::{Color, QrCode};
use std::fs;
use std::path::{Path, PathBuf};

/// Pixels per QR module
pub const SCALE: usize = 4;
/// Light border around the code, in modules
pub const QUIET_ZONE: usize = 4;

pub const STUDENTS: &str = "\
Roll Number,Student Name,Department
101,Asha,CS
102,Ravi,ECE
103,Meena,MECH
104,John,CIVIL
";

/// Render `text` as a clean black-on-white QR frame
pub fn render_qr(text: &str) -> Frame {
    let code = QrCode::new(text.as_bytes()).expect("payload fits in a QR code");
    let modules = code.width();
    let colors = code.to_colors();

    let side = (modules + 2 * QUIET_ZONE) * SCALE;
    let mut luma = vec![255u8; side * side];
    for y in 0..side {
        for x in 0..side {
            let mx = (x / SCALE).wrapping_sub(QUIET_ZONE);
            let my = (y / SCALE).wrapping_sub(QUIET_ZONE);
            if mx < modules && my < modules && colors[my * modules + mx] == Color::Dark {
                luma[y * side + x] = 0;
            }
        }
    }

    Frame::from_luma(side, side, luma).expect("buffer matches dimensions")
}

/// Plain white frame with nothing to decode
pub fn blank_frame(side: usize) -> Frame {
    Frame::from_luma(side, side, vec![255; side * side]).expect("buffer matches dimensions")
}

/// Save a frame as a greyscale PNG
pub fn save_png(frame: &Frame, path: &Path) {
    let img = image::GrayImage::from_raw(
        frame.width() as u32,
        frame.height() as u32,
        frame.luma().to_vec(),
    )
    .expect("luma buffer matches dimensions");
    img.save(path).expect("failed to write png");
}

/// Write a roster CSV into `dir` and return its path
pub fn write_roster(dir: &Path, csv: &str) -> PathBuf {
    let path = dir.join("students.csv");
    fs::write(&path, csv).expect("failed to write roster");
    path
}

pub fn payload(roll: &str) -> String {
    format!(r#"{{"roll_no": "{roll}"}}"#)
}
