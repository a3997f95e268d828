//! 스트림 프레임 조립.
//!
//! 분할된 텍스트 프레임을 완전한 메시지로 이어 붙입니다. 누적 버퍼는 연결 하나에만
//! 속하며, 해당 연결의 읽기 태스크만 접근합니다.

/// 전송 계층에 수신 허용량(credit)을 부여하는 인터페이스.
pub trait FlowControl: Send {
    /// 메시지 단위 `n`개를 더 받을 수 있도록 허용합니다.
    fn request(&mut self, n: u64);
}

/// 읽기 루프가 소비하는 수신 허용량 카운터.
///
/// 허용량이 있을 때만 다음 프레임을 읽습니다.
#[derive(Debug, Clone, Default)]
pub struct ReceiveCredit {
    available: u64,
    granted_total: u64,
}

impl ReceiveCredit {
    /// 초기 허용량을 가진 카운터 생성.
    pub fn new(initial: u64) -> Self {
        Self {
            available: initial,
            granted_total: initial,
        }
    }

    /// 허용량 하나를 소비합니다. 남은 허용량이 없으면 `false`.
    pub fn try_acquire(&mut self) -> bool {
        if self.available == 0 {
            return false;
        }
        self.available -= 1;
        true
    }

    pub fn available(&self) -> u64 {
        self.available
    }

    /// 지금까지 부여된 총 허용량.
    pub fn granted_total(&self) -> u64 {
        self.granted_total
    }
}

impl FlowControl for ReceiveCredit {
    fn request(&mut self, n: u64) {
        self.available = self.available.saturating_add(n);
        self.granted_total = self.granted_total.saturating_add(n);
    }
}

/// 분할 프레임 조립기.
#[derive(Debug)]
pub struct FrameAssembler<F: FlowControl> {
    buffer: String,
    flow: F,
}

impl<F: FlowControl> FrameAssembler<F> {
    pub fn new(flow: F) -> Self {
        Self {
            buffer: String::new(),
            flow,
        }
    }

    /// 프레임 조각 하나를 받습니다.
    ///
    /// `is_final`이면 누적된 전체 메시지를 반환하고 버퍼를 비웁니다. 결과와 관계없이
    /// 조각 하나를 소비할 때마다 허용량 1을 부여합니다.
    pub fn on_fragment(&mut self, data: &str, is_final: bool) -> Option<String> {
        self.buffer.push_str(data);
        self.flow.request(1);

        if is_final {
            Some(std::mem::take(&mut self.buffer))
        } else {
            None
        }
    }

    /// 조립 중인 데이터가 있는지 확인.
    pub fn has_partial(&self) -> bool {
        !self.buffer.is_empty()
    }

    pub fn flow(&self) -> &F {
        &self.flow
    }

    pub fn flow_mut(&mut self) -> &mut F {
        &mut self.flow
    }
}
