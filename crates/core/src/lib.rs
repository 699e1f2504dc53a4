pub mod shared {
    pub mod classroom_id;
    pub mod constants;
    pub mod frame;
    pub mod settings;
}

pub mod backend {
    pub mod domain {
        pub mod recognition_backend;
    }
    pub mod infrastructure {
        pub mod http_backend;
    }
}

pub mod capture {
    pub mod domain {
        pub mod captured_frame;
        pub mod video_source;
    }
    pub mod infrastructure {
        pub mod image_dir_source;
        pub mod jpeg_encoder;
    }
    pub mod frame_pipeline;
}

pub mod roster {
    pub mod domain {
        pub mod attendance_record;
        pub mod roster_snapshot;
    }
    pub mod roster_view_model;
}

pub mod session {
    pub mod domain {
        pub mod session;
        pub mod session_notifier;
        pub mod task_scheduler;
    }
    pub mod infrastructure {
        pub mod thread_scheduler;
    }
    pub mod session_controller;
}

#[cfg(test)]
mod testing;
