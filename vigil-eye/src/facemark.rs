//! Haar cascade face boxes refined into 68 landmarks by an LBF facemark model

use crate::config::VisionConfig;
use crate::cv::{image_to_mat, to_gray};
use crate::error::VisionError;
use crate::frame::Frame;
use crate::landmarks::LandmarkProvider;
use opencv::{
    core::{Point2f, Ptr, Rect, Size, Vector},
    face::{self, Facemark},
    objdetect::CascadeClassifier,
    prelude::*,
};
use std::path::Path;
use tracing::{debug, info};
use vigil_core::LandmarkSet;

pub struct FacemarkProvider {
    cascade: CascadeClassifier,
    facemark: Ptr<Facemark>,
    min_face: i32,
}

fn model_file(path: &Path) -> Result<String, VisionError> {
    if !path.exists() {
        return Err(VisionError::Model(format!("model file not found: {}", path.display())));
    }
    Ok(path.to_string_lossy().into_owned())
}

impl FacemarkProvider {
    pub fn new(config: &VisionConfig) -> Result<Self, VisionError> {
        let cascade_path = config.cascade_path();
        let facemark_path = config.facemark_path();

        let cascade = CascadeClassifier::new(&model_file(&cascade_path)?)
            .map_err(|e| VisionError::Model(format!("Failed to load cascade: {}", e)))?;

        let mut facemark = face::create_facemark_lbf()?;
        facemark
            .load_model(&model_file(&facemark_path)?)
            .map_err(|e| VisionError::Model(format!("Failed to load facemark model: {}", e)))?;

        info!(
            "Landmark models loaded from {:?} and {:?}",
            cascade_path, facemark_path
        );

        Ok(Self {
            cascade,
            facemark,
            min_face: config.min_face_size as i32,
        })
    }
}

impl LandmarkProvider for FacemarkProvider {
    fn name(&self) -> &str {
        "facemark-lbf"
    }

    fn detect(&mut self, frame: &Frame) -> Result<Vec<LandmarkSet>, VisionError> {
        let bgr = image_to_mat(&frame.image)?;
        let gray = to_gray(&bgr)?;

        let mut boxes = Vector::<Rect>::new();
        self.cascade.detect_multi_scale(
            &gray,
            &mut boxes,
            1.1,
            5,
            0,
            Size::new(self.min_face, self.min_face),
            Size::default(),
        )?;

        if boxes.is_empty() {
            return Ok(Vec::new());
        }

        let mut shapes = Vector::<Vector<Point2f>>::new();
        if !self.facemark.fit(&gray, &boxes, &mut shapes)? {
            debug!("Facemark fit failed on frame {}", frame.sequence);
            return Ok(Vec::new());
        }

        let faces = shapes
            .iter()
            .filter_map(|shape| {
                LandmarkSet::from_pairs(shape.iter().map(|p| (p.x, p.y)))
                    .map_err(|e| debug!("Discarding face: {}", e))
                    .ok()
            })
            .collect();
        Ok(faces)
    }
}
