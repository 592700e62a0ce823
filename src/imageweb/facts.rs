//! Rotating facts shown while an image is being generated.

use std::time::{Duration, Instant};

use crate::core::surface::Surface;

pub const FACT_TEXT: &str = "fact-text";
pub const FACT_INTERVAL: Duration = Duration::from_secs(5);

pub const FACTS: [&str; 30] = [
    "Нейросети для изображений часто используют архитектуру диффузии: картинка «проявляется» из шума шаг за шагом.",
    "Модель nano-banana умеет переносить лицо с референса в новую сцену, сохраняя узнаваемость.",
    "Чем конкретнее промпт, тем предсказуемее результат — добавьте стиль, освещение и композицию.",
    "Референсные фото помогают зафиксировать внешность человека или стиль объекта в сгенерированной сцене.",
    "GRS AI поддерживает несколько моделей: от быстрых до более детализированных, например flux.",
    "Генерация в высоком разрешении занимает больше времени, но даёт более чёткое изображение.",
    "Текстовые подсказки на английском часто дают более стабильный результат у международных моделей.",
    "Несколько референсов можно комбинировать: например, лицо с одного фото, поза — с другого.",
    "ИИ не хранит ваши референсы после генерации — они используются только в рамках одного запроса.",
    "Артефакты на руках или буквах часто исправляют повторной генерацией или уточнением промпта.",
    "Слова «фотореалистично», «высокое качество» в промпте могут усилить детализацию.",
    "Нейросети обучаются на миллионах изображений и комбинируют паттерны, а не копируют картинки целиком.",
    "Ограничение в 5 референсов помогает и балансу качества, и скорости ответа API.",
    "История генераций привязана к вашему аккаунту Telegram и не видна другим пользователям.",
    "Кнопка «Сделать заново» отправляет тот же промпт и референсы — результат может отличаться.",
    "Модели типа nano-banana оптимизированы под портреты и сцены с людьми по референсу.",
    "Промпты можно описывать и на русском: многие модели понимают несколько языков.",
    "Сохраняйте понравившиеся результаты через «Скачать» — они остаются только в вашей истории на сервере.",
    "Во время генерации можно читать факты о нейросетях — они меняются каждые 5 секунд.",
    "Telegram Login не передаёт пароль: авторизация идёт через подтверждение в приложении Telegram.",
    "Cookie сессии хранится 30 дней — не нужно входить при каждом визите.",
    "Размер 1024×1024 — стандарт для многих моделей; другие пропорции могут поддерживаться отдельно.",
    "Диффузионные модели «убирают шум» из случайной картинки, ориентируясь на текст и референсы.",
    "Чем больше деталей в промпте (фон, одежда, время суток), тем ближе результат к задумке.",
    "API GRS AI можно вызывать и из скриптов: например, для пакетной генерации обложек.",
    "Референс «лицо» обычно ставят первым в списке — так модель понимает, кого сохранять в сцене.",
    "Генерация занимает от нескольких секунд до минуты в зависимости от нагрузки и сложности.",
    "Все изображения сохраняются на сервере в папке, привязанной к вашему Telegram ID.",
    "Виджет «Войти через Telegram» проверяется по криптографической подписи — подделать данные нельзя.",
    "FLOW и flowcabinet.ru — проект, в котором используется эта страница генерации.",
];

/// Carousel over [`FACTS`]. The host drives time by calling [`FactsCarousel::tick`].
#[derive(Debug, Default)]
pub struct FactsCarousel {
    index: usize,
    next_at: Option<Instant>,
}

impl FactsCarousel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn current(&self) -> &'static str {
        FACTS[self.index]
    }

    pub fn is_running(&self) -> bool {
        self.next_at.is_some()
    }

    /// Shows the fact at `index`, wrapping in both directions.
    pub fn show(&mut self, index: i64, surface: &mut Surface) {
        let len = FACTS.len() as i64;
        self.index = index.rem_euclid(len) as usize;
        surface.set_text(FACT_TEXT, self.current());
    }

    pub fn start(&mut self, now: Instant, surface: &mut Surface) {
        self.show(self.index as i64, surface);
        self.next_at = Some(now + FACT_INTERVAL);
    }

    pub fn stop(&mut self) {
        self.next_at = None;
    }

    pub fn next(&mut self, now: Instant, surface: &mut Surface) {
        self.show(self.index as i64 + 1, surface);
        self.restart(now);
    }

    pub fn prev(&mut self, now: Instant, surface: &mut Surface) {
        self.show(self.index as i64 - 1, surface);
        self.restart(now);
    }

    /// Manual navigation restarts the interval, but only while running.
    fn restart(&mut self, now: Instant) {
        if self.next_at.is_some() {
            self.next_at = Some(now + FACT_INTERVAL);
        }
    }

    /// Advances when the interval elapsed. Returns whether the fact changed.
    pub fn tick(&mut self, now: Instant, surface: &mut Surface) -> bool {
        match self.next_at {
            Some(at) if now >= at => {
                self.show(self.index as i64 + 1, surface);
                self.next_at = Some(now + FACT_INTERVAL);
                true
            }
            _ => false,
        }
    }
}
