use candle_core::{DType, Tensor};

use crate::error::DetectorError;

/// Number of features per candidate: 4 box parameters and 80 class scores.
pub const NUM_FEATURES: usize = 84;

/// Number of box parameters leading each candidate.
pub const NUM_BOX_PARAMS: usize = 4;

/// Flat backend output with its shape, as produced for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTensor {
    data: Vec<f32>,
    shape: Vec<usize>,
}

impl RawTensor {
    /// Wrap a flat buffer and the shape it should be read with.
    ///
    /// The buffer length is checked against the shape when the tensor is
    /// normalized, not here.
    pub fn new(data: Vec<f32>, shape: Vec<usize>) -> Self {
        Self { data, shape }
    }

    /// Copy a candle tensor of any float dtype into a flat f32 buffer.
    pub fn from_tensor(tensor: &Tensor) -> Result<Self, DetectorError> {
        let shape = tensor.dims().to_vec();
        let data = tensor.to_dtype(DType::F32)?.flatten_all()?.to_vec1::<f32>()?;
        Ok(Self { data, shape })
    }

    /// The flat buffer.
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// The shape descriptor.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Resolve the tensor into an 84 x N view.
    ///
    /// Accepted shapes:
    ///
    /// * `[1, 84, N]`
    /// * `[1, 84, h, w]` with `h * w == expected_detections`
    /// * `[1, 1, 1, 1, 1, 1, N, 84]`, detection-major
    pub fn canonical_view(
        &self,
        expected_detections: usize,
    ) -> Result<CanonicalView<'_>, DetectorError> {
        let shape = self.shape.as_slice();
        let unsupported = || DetectorError::unsupported_shape(shape);

        let Some(len) = shape.iter().try_fold(1usize, |acc, &d| acc.checked_mul(d)) else {
            tracing::warn!("tensor shape {:?} overflows", shape);
            return Err(unsupported());
        };
        if len != self.data.len() {
            tracing::warn!(
                "tensor buffer holds {} values, shape {:?} needs {}",
                self.data.len(),
                shape,
                len
            );
            return Err(unsupported());
        }

        let view = match *shape {
            [batch, features, detections] => {
                if batch != 1 || features != NUM_FEATURES {
                    return Err(unsupported());
                }
                CanonicalView::feature_major(&self.data, detections)
            }
            [batch, channels, h, w] => {
                let detections = h.checked_mul(w);
                if batch != 1 || channels != NUM_FEATURES || detections != Some(expected_detections)
                {
                    return Err(unsupported());
                }
                CanonicalView::feature_major(&self.data, expected_detections)
            }
            [b0, b1, b2, b3, b4, b5, detections, features] => {
                if [b0, b1, b2, b3, b4, b5].iter().any(|&d| d != 1) || features != NUM_FEATURES
                {
                    return Err(unsupported());
                }
                if detections != expected_detections {
                    tracing::warn!(
                        "8D output has {} detections, expected {}",
                        detections,
                        expected_detections
                    );
                }
                CanonicalView::detection_major(&self.data, detections)
            }
            _ => return Err(unsupported()),
        };

        tracing::debug!(
            "resolved output shape {:?} to {} x {}",
            shape,
            NUM_FEATURES,
            view.num_detections()
        );

        Ok(view)
    }
}

/// Read-only 84 x N projection over a backend buffer.
#[derive(Debug, Clone, Copy)]
pub struct CanonicalView<'a> {
    data: &'a [f32],
    num_detections: usize,
    feature_stride: usize,
    detection_stride: usize,
}

impl<'a> CanonicalView<'a> {
    fn feature_major(data: &'a [f32], num_detections: usize) -> Self {
        Self {
            data,
            num_detections,
            feature_stride: num_detections,
            detection_stride: 1,
        }
    }

    fn detection_major(data: &'a [f32], num_detections: usize) -> Self {
        Self {
            data,
            num_detections,
            feature_stride: 1,
            detection_stride: NUM_FEATURES,
        }
    }

    /// Number of candidate detections N.
    pub fn num_detections(&self) -> usize {
        self.num_detections
    }

    /// Value of `feature` for candidate `detection`.
    ///
    /// # Panics
    ///
    /// Panics if `feature >= 84` or `detection >= N`.
    #[inline]
    pub fn get(&self, feature: usize, detection: usize) -> f32 {
        assert!(feature < NUM_FEATURES && detection < self.num_detections);
        self.data[feature * self.feature_stride + detection * self.detection_stride]
    }

    /// Box parameters `(cx, cy, w, h)` of a candidate, in model input pixels.
    pub fn raw_box(&self, detection: usize) -> [f32; 4] {
        [
            self.get(0, detection),
            self.get(1, detection),
            self.get(2, detection),
            self.get(3, detection),
        ]
    }

    /// Highest class score of a candidate and its class index.
    ///
    /// Ties go to the lowest class index. NaN scores never win; when no
    /// score is above zero the result is `(0, 0.0)`.
    pub fn best_class(&self, detection: usize) -> (usize, f32) {
        let mut class_index = 0;
        let mut max_score = 0.0;
        for c in 0..NUM_FEATURES - NUM_BOX_PARAMS {
            let score = self.get(NUM_BOX_PARAMS + c, detection);
            if score > max_score {
                max_score = score;
                class_index = c;
            }
        }
        (class_index, max_score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Feature-major buffer where value = feature * 1000 + detection.
    fn feature_major_data(num_detections: usize) -> Vec<f32> {
        (0..NUM_FEATURES)
            .flat_map(|f| (0..num_detections).map(move |d| (f * 1000 + d) as f32))
            .collect()
    }

    #[test]
    fn test_rank3_view() -> Result<(), Box<dyn std::error::Error>> {
        let raw = RawTensor::new(feature_major_data(5), vec![1, 84, 5]);
        let view = raw.canonical_view(8400)?;
        assert_eq!(view.num_detections(), 5);
        assert_eq!(view.get(0, 0), 0.0);
        assert_eq!(view.get(2, 3), 2003.0);
        assert_eq!(view.get(83, 4), 83004.0);
        Ok(())
    }

    #[test]
    fn test_rank4_view_flattens_spatial_axes() -> Result<(), Box<dyn std::error::Error>> {
        let raw = RawTensor::new(feature_major_data(6), vec![1, 84, 2, 3]);
        let view = raw.canonical_view(6)?;
        assert_eq!(view.num_detections(), 6);
        assert_eq!(view.get(4, 5), 4005.0);

        let raw = RawTensor::new(feature_major_data(8400), vec![1, 84, 80, 105]);
        assert_eq!(raw.canonical_view(8400)?.num_detections(), 8400);
        Ok(())
    }

    #[test]
    fn test_rank8_view_is_detection_major() -> Result<(), Box<dyn std::error::Error>> {
        // value = detection * 1000 + feature
        let data: Vec<f32> = (0..3)
            .flat_map(|d| (0..NUM_FEATURES).map(move |f| (d * 1000 + f) as f32))
            .collect();
        let raw = RawTensor::new(data, vec![1, 1, 1, 1, 1, 1, 3, 84]);
        let view = raw.canonical_view(8400)?;
        assert_eq!(view.num_detections(), 3);
        assert_eq!(view.get(0, 2), 2000.0);
        assert_eq!(view.get(83, 1), 1083.0);
        assert_eq!(view.raw_box(1), [1000.0, 1001.0, 1002.0, 1003.0]);
        Ok(())
    }

    #[test]
    fn test_unsupported_shapes() {
        let cases: Vec<Vec<usize>> = vec![
            vec![84, 10],
            vec![2, 84, 5],
            vec![1, 85, 5],
            vec![1, 84, 2, 3],
            vec![1, 80, 2, 3],
            vec![1, 1, 1, 1, 2, 1, 5, 84],
            vec![1, 1, 1, 1, 1, 1, 5, 85],
            vec![1, 1, 84, 5, 1],
        ];
        for shape in cases {
            let len = shape.iter().product();
            let raw = RawTensor::new(vec![0.0; len], shape.clone());
            match raw.canonical_view(5) {
                Err(DetectorError::UnsupportedTensorShape { shape: reported }) => {
                    assert_eq!(reported, shape)
                }
                other => panic!("shape {shape:?} should be rejected, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_overflowing_shapes_are_rejected() {
        let cases: Vec<Vec<usize>> = vec![
            vec![1, 84, usize::MAX / 2],
            vec![1, 84, usize::MAX / 4, 4],
            vec![1, 84, 0, usize::MAX],
        ];
        for shape in cases {
            let raw = RawTensor::new(Vec::new(), shape);
            assert!(matches!(
                raw.canonical_view(8400),
                Err(DetectorError::UnsupportedTensorShape { .. })
            ));
        }
    }

    #[test]
    fn test_buffer_length_mismatch_is_rejected() {
        let raw = RawTensor::new(vec![0.0; 84 * 4], vec![1, 84, 5]);
        assert!(matches!(
            raw.canonical_view(8400),
            Err(DetectorError::UnsupportedTensorShape { .. })
        ));
    }

    #[test]
    fn test_zero_detections() -> Result<(), Box<dyn std::error::Error>> {
        let raw = RawTensor::new(Vec::new(), vec![1, 84, 0]);
        assert_eq!(raw.canonical_view(8400)?.num_detections(), 0);
        Ok(())
    }

    #[test]
    fn test_best_class_prefers_lowest_index_on_ties() -> Result<(), Box<dyn std::error::Error>> {
        let mut data = vec![0.0; NUM_FEATURES];
        data[4 + 7] = 0.6;
        data[4 + 3] = 0.6;
        data[4 + 50] = 0.2;
        let raw = RawTensor::new(data, vec![1, 84, 1]);
        let view = raw.canonical_view(8400)?;
        assert_eq!(view.best_class(0), (3, 0.6));
        Ok(())
    }

    #[test]
    fn test_best_class_skips_nan_scores() -> Result<(), Box<dyn std::error::Error>> {
        let mut data = vec![0.0; NUM_FEATURES];
        data[4] = f32::NAN;
        data[4 + 19] = 0.9;
        let raw = RawTensor::new(data, vec![1, 84, 1]);
        let view = raw.canonical_view(8400)?;
        assert_eq!(view.best_class(0), (19, 0.9));
        Ok(())
    }

    #[test]
    fn test_best_class_without_positive_score() -> Result<(), Box<dyn std::error::Error>> {
        let raw = RawTensor::new(vec![-1.0; NUM_FEATURES], vec![1, 84, 1]);
        let view = raw.canonical_view(8400)?;
        assert_eq!(view.best_class(0), (0, 0.0));
        Ok(())
    }

    #[test]
    #[should_panic]
    fn test_get_out_of_range_panics() {
        let raw = RawTensor::new(vec![0.0; NUM_FEATURES * 2], vec![1, 84, 2]);
        let view = raw.canonical_view(8400).expect("valid shape");
        view.get(0, 2);
    }

    #[test]
    fn test_from_candle_tensor() -> Result<(), Box<dyn std::error::Error>> {
        let tensor = Tensor::zeros((1, 84, 2), DType::F64, &candle_core::Device::Cpu)?;
        let raw = RawTensor::from_tensor(&tensor)?;
        assert_eq!(raw.shape(), &[1, 84, 2]);
        assert_eq!(raw.data().len(), 168);
        Ok(())
    }
}
