use argh::FromArgs;
use std::path::PathBuf;

use candle_core::{Device, Tensor};
use herdcam_yolo::{
    CanvasSize, CategoryStats, DetectionSet, DetectionSink, Detector, DetectorConfig,
    DetectorError, InferenceBackend, LatestDetections, NUM_FEATURES, RawTensor,
};
use kornia_image::{Image, ImageSize};
use kornia_io::functional as F;

#[derive(FromArgs)]
/// Simulated herd detection application arguments
struct Args {
    /// path to a background image, a gray canvas is used otherwise
    #[argh(option)]
    image_path: Option<PathBuf>,

    /// number of sampled frames to simulate
    #[argh(option, default = "300")]
    frames: u32,

    /// the confidence threshold for the detector
    #[argh(option, default = "0.25")]
    confidence_threshold: f32,

    /// the iou threshold for the detector
    #[argh(option, default = "0.4")]
    iou_threshold: f32,

    /// process every n-th frame
    #[argh(option, default = "3")]
    frame_skip: u32,
}

/// An animal walking in circles, seen by the detector as one class.
struct Walker {
    class_index: usize,
    center: (f32, f32),
    radius: f32,
    speed: f32,
    phase: f32,
    size: (f32, f32),
}

impl Walker {
    fn position(&self, t: f32) -> (f32, f32) {
        let angle = t * self.speed + self.phase;
        (
            self.center.0 + self.radius * angle.cos(),
            self.center.1 + self.radius * angle.sin(),
        )
    }
}

/// Backend emitting a YOLOv8-shaped output for a few wandering animals.
///
/// Each animal yields two slightly shifted candidates so that non-maximum
/// suppression has something to do.
struct SimulatedBackend {
    device: Device,
    walkers: Vec<Walker>,
    tick: u32,
}

impl SimulatedBackend {
    fn new() -> Self {
        let walker = |class_index, center, radius, speed, phase, size| Walker {
            class_index,
            center,
            radius,
            speed,
            phase,
            size,
        };
        Self {
            device: Device::Cpu,
            walkers: vec![
                walker(0, (320.0, 420.0), 120.0, 0.05, 0.0, (60.0, 150.0)),
                walker(19, (200.0, 300.0), 80.0, 0.03, 1.0, (140.0, 90.0)),
                walker(19, (450.0, 250.0), 60.0, 0.04, 2.5, (130.0, 85.0)),
                walker(18, (150.0, 500.0), 50.0, 0.06, 4.0, (90.0, 70.0)),
                walker(14, (520.0, 520.0), 40.0, 0.09, 0.5, (30.0, 30.0)),
                // a car driving by, never reported
                walker(2, (320.0, 120.0), 200.0, 0.02, 0.0, (160.0, 80.0)),
            ],
            tick: 0,
        }
    }
}

impl InferenceBackend for SimulatedBackend {
    fn device(&self) -> &Device {
        &self.device
    }

    fn infer(&mut self, _input: &Tensor) -> Result<RawTensor, DetectorError> {
        let n = 8400;
        let mut data = vec![0.0f32; NUM_FEATURES * n];
        let t = self.tick as f32;
        self.tick += 1;

        let mut slot = 0;
        for walker in &self.walkers {
            let (x, y) = walker.position(t);
            for (dx, score) in [(0.0, 0.85), (6.0, 0.55)] {
                let values = [x + dx, y, walker.size.0, walker.size.1];
                for (f, v) in values.into_iter().enumerate() {
                    data[f * n + slot] = v;
                }
                data[(4 + walker.class_index) * n + slot] = score;
                slot += 1;
            }
        }

        Ok(RawTensor::new(data, vec![1, NUM_FEATURES, n]))
    }
}

/// Logs every processed frame to rerun.
struct RerunSink {
    rec: rerun::RecordingStream,
}

impl DetectionSink for RerunSink {
    fn consume(&mut self, detections: &DetectionSet) {
        let mut boxes_mins = Vec::new();
        let mut boxes_sizes = Vec::new();
        let mut labels = Vec::new();
        let mut colors = Vec::new();
        for item in &detections.items {
            let d = &item.detection;
            boxes_mins.push((d.xmin, d.ymin));
            boxes_sizes.push((d.width(), d.height()));
            labels.push(format!("{} {}", item.label(), item.confidence_label()));
            let [r, g, b] = item.color();
            colors.push(rerun::Color::from_rgb(r, g, b));
        }

        let logged = self.rec.log(
            "boxes",
            &rerun::Boxes2D::from_mins_and_sizes(boxes_mins, boxes_sizes)
                .with_labels(labels)
                .with_colors(colors),
        );
        if let Err(e) = logged {
            tracing::warn!("failed to log frame {}: {}", detections.frame, e);
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let args: Args = argh::from_env();

    let rec = rerun::RecordingStreamBuilder::new("Simulated Herd Detection").spawn()?;

    let config = DetectorConfig {
        confidence_threshold: args.confidence_threshold,
        iou_threshold: args.iou_threshold,
        frame_skip: args.frame_skip,
        ..Default::default()
    };

    let mut detector = Detector::new(config, SimulatedBackend::new())?;
    let mut counters = detector.new_counters();
    let mut stride = detector.frame_stride();
    let mut stats = CategoryStats::new(&detector.config().target_categories);
    let mut latest = LatestDetections::default();
    let mut sink = RerunSink { rec: rec.clone() };

    // read the background as RGB8
    let image = match args.image_path {
        Some(path) => F::read_image_any(path)?,
        None => Image::<u8, 3>::from_size_val(
            ImageSize {
                width: 1280,
                height: 720,
            },
            96,
        )?,
    };
    let canvas = CanvasSize::from(image.size());

    rec.log(
        "image",
        &rerun::Image::from_elements(
            image.as_slice(),
            image.size().into(),
            rerun::ColorModel::RGB,
        ),
    )?;

    for frame_index in 0..args.frames {
        if !stride.tick() {
            continue;
        }
        rec.set_time_sequence("frame", frame_index as i64);

        // perform detection on the frame
        let detections = detector.process_frame(&image, canvas, &mut counters);

        stats.consume(&detections);
        sink.consume(&detections);
        latest.offer(detections);

        tracing::info!("frame {}: {}", frame_index, stats);

        if !detector.is_enabled() {
            break;
        }
    }

    if let Some(last) = latest.get() {
        tracing::info!("last processed frame {} had {} detections", last.frame, last.len());
    }

    Ok(())
}
