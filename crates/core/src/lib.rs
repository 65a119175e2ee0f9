//! Depth camera acquisition with aligned depth, colorized depth and face
//! redaction.

pub mod shared {
    pub mod calibration;
    pub mod constants;
    pub mod depth_frame;
    pub mod detection_box;
    pub mod frame;
    pub mod settings;
    pub mod stream_config;
}

pub mod capture {
    pub mod device_claim;
    pub mod sensor_session;
    pub mod domain {
        pub mod capture_error;
        pub mod depth_sensor;
        pub mod frame_set;
    }
    pub mod infrastructure;
}

pub mod alignment {
    pub mod depth_aligner;
    pub mod frame_synchronizer;
}

pub mod colorizing {
    pub mod color_scheme;
    pub mod depth_colorizer;
}

pub mod detection {
    pub mod domain {
        pub mod face_detector;
    }
    pub mod infrastructure;
}

pub mod redaction {
    pub mod face_redactor;
    pub mod domain {
        pub mod frame_redactor;
    }
    pub mod infrastructure;
}

pub mod pipeline {
    pub mod acquisition_pipeline;
    pub mod pipeline_error;
    pub mod pipeline_logger;
    pub mod infrastructure;
}

pub mod storage {
    pub mod domain {
        pub mod image_writer;
    }
    pub mod infrastructure;
}
